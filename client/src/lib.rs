//! The chat relay client library.
//!
//! Split out from `main` the way the server crate splits `startup` from its
//! binary, so the connect/session pieces are independently testable.

pub mod config;
pub mod crypto;
pub mod error;
pub mod session;
pub mod tls;
pub mod ui;

use anyhow::{Context, Result};
use tokio::net::TcpStream;
use tokio_rustls::rustls::pki_types::ServerName;

use self::{config::Connection, crypto::Keypair};

/// Connects to `connection.host`, completes the TLS handshake, and drives
/// the session to completion. Returns once the user quits or the server
/// ends the session.
pub async fn connect_and_run(connection: Connection, ca_cert: Option<&str>) -> Result<()> {
    let keypair = Keypair::generate().context("generating keypair")?;

    let (host, _) = connection
        .host
        .split_once(':')
        .unwrap_or((connection.host.as_str(), ""));

    let tcp = TcpStream::connect(&connection.host).await.context("connecting to relay")?;
    tcp.set_nodelay(true).ok();

    let connector = tls::connector(ca_cert)?;
    let server_name = ServerName::try_from(host.to_string()).context("invalid host name")?;
    let stream = connector.connect(server_name, tcp).await.context("tls handshake")?;

    session::run(stream, &connection.username, &connection.password, &keypair).await?;

    Ok(())
}
