#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::Parser;

use chat_relay_client::config::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    simple_logger::init_with_level(log::Level::Info)?;

    let cli = Cli::parse();
    let ca_cert = cli.ca_cert.clone();
    let connection = cli.resolve()?;

    chat_relay_client::connect_and_run(connection, ca_cert.as_deref()).await
}
