use std::io::{self, IsTerminal, Write};

use anyhow::Result;
use clap::Parser;

/// Interactive client configuration. Unlike the server there is no file to
/// load: any field left off the command line is prompted for, matching the
/// original's interactive host/username/password flow.
#[derive(Parser, Debug)]
#[command(
    about = env!("CARGO_PKG_DESCRIPTION"),
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Relay host, e.g. `chat.example.com:8080`. Prompted for if omitted.
    #[arg(long)]
    pub host: Option<String>,

    /// Username to authenticate as. Prompted for if omitted.
    #[arg(long)]
    pub username: Option<String>,

    /// Path to a PEM-encoded trust root to verify the server's certificate
    /// against. Omitting this matches the original's known weakness of
    /// accepting the server's certificate unconditionally (see the
    /// project's design notes) — use this flag to opt into real
    /// verification.
    #[arg(long)]
    pub ca_cert: Option<String>,
}

pub struct Connection {
    pub host: String,
    pub username: String,
    pub password: String,
}

impl Cli {
    /// Resolves the host/username/password, prompting on stdin for
    /// anything not given on the command line. The password is always
    /// prompted without echo, never taken from the command line.
    pub fn resolve(self) -> Result<Connection> {
        let host = match self.host {
            Some(host) => host,
            None => prompt("Host (host:port): ")?,
        };

        let username = match self.username {
            Some(username) => username,
            None => prompt("Username: ")?,
        };

        let password = if io::stdin().is_terminal() {
            rpassword::prompt_password("Password: ")?
        } else {
            prompt("Password: ")?
        };

        Ok(Connection { host, username, password })
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
