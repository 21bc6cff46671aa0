use std::{collections::HashMap, fs::read_to_string, net::SocketAddr, str::FromStr};

use anyhow::Result;
use clap::Parser;
use serde::Deserialize;

/// TLS certificate/key paths.
///
/// Both default to files named `cert.pem`/`key.pem` in the server's working
/// directory. If neither exists at startup the server generates a
/// self-signed pair and writes them there, mirroring the original's
/// `GenerateServerCert` on first run.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Tls {
    #[serde(default = "Tls::certificate_chain")]
    pub certificate_chain: String,
    #[serde(default = "Tls::private_key")]
    pub private_key: String,
}

impl Tls {
    fn certificate_chain() -> String {
        "cert.pem".to_string()
    }

    fn private_key() -> String {
        "key.pem".to_string()
    }
}

impl Default for Tls {
    fn default() -> Self {
        Self {
            certificate_chain: Self::certificate_chain(),
            private_key: Self::private_key(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value {
            "trace" => Self::Trace,
            "debug" => Self::Debug,
            "info" => Self::Info,
            "warn" => Self::Warn,
            "error" => Self::Error,
            _ => return Err(format!("unknown log level: {value}")),
        })
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

impl LogLevel {
    pub fn as_level(&self) -> log::Level {
        match *self {
            Self::Error => log::Level::Error,
            Self::Debug => log::Level::Debug,
            Self::Trace => log::Level::Trace,
            Self::Warn => log::Level::Warn,
            Self::Info => log::Level::Info,
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Log {
    #[serde(default)]
    pub level: LogLevel,
}

/// Static credential table.
///
/// When empty, the server accepts any username/password pair, matching the
/// original's "Assume that the username and password are correct" stub.
/// When populated, a connecting client's password must match the entry
/// keyed by its username.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Auth {
    #[serde(default)]
    pub static_credentials: HashMap<String, String>,
}

impl Auth {
    /// Checks `username`/`password` against the static table. See
    /// [`Auth::static_credentials`] for the open-table behavior.
    pub fn check(&self, username: &str, password: &str) -> bool {
        if self.static_credentials.is_empty() {
            return true;
        }

        self.static_credentials
            .get(username)
            .is_some_and(|expected| expected == password)
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// TCP address the relay listens on.
    #[serde(default = "Config::listen")]
    pub listen: SocketAddr,
    /// Carried only for logs/identifiers; has no semantic effect on the
    /// protocol itself.
    #[serde(default = "Config::realm")]
    pub realm: String,
    #[serde(default)]
    pub tls: Tls,
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub auth: Auth,
}

impl Config {
    fn listen() -> SocketAddr {
        "0.0.0.0:8080".parse().unwrap()
    }

    fn realm() -> String {
        "localhost".to_string()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: Self::listen(),
            realm: Self::realm(),
            tls: Tls::default(),
            log: Log::default(),
            auth: Auth::default(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    about = env!("CARGO_PKG_DESCRIPTION"),
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
)]
struct Cli {
    /// Path to a JSON5 configuration file. Absent means defaults.
    #[arg(long, short)]
    config: Option<String>,
}

impl Config {
    /// Loads configuration from an optional `--config` file, falling back
    /// to defaults when none is given.
    pub fn load() -> Result<Self> {
        Ok(match Cli::parse().config {
            Some(path) => serde_json5::from_str(&read_to_string(path)?)?,
            None => Self::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_auth_table_accepts_anything() {
        let auth = Auth::default();
        assert!(auth.check("anyone", "anything"));
    }

    #[test]
    fn populated_auth_table_checks_password() {
        let mut creds = HashMap::new();
        creds.insert("alice".to_string(), "hunter2".to_string());
        let auth = Auth {
            static_credentials: creds,
        };

        assert!(auth.check("alice", "hunter2"));
        assert!(!auth.check("alice", "wrong"));
        assert!(!auth.check("bob", "hunter2"));
    }
}
