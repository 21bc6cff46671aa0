//! The chat relay server library.
//!
//! [`startup`] is split out from `main` so integration tests can start a
//! real server in-process, the way the teacher's own integration suite
//! drives its server crate directly rather than shelling out to a binary.

pub mod config;
pub mod error;
pub mod observer;
pub mod server;
pub mod tls;

use std::sync::Arc;

use self::{config::Config, observer::Observer};

/// Starts the relay and runs until the listener errors. Never returns on
/// the happy path.
pub async fn startup(config: Arc<Config>, observer: Arc<dyn Observer>) -> anyhow::Result<()> {
    server::run(config, observer).await
}
