use std::net::SocketAddr;

use codec::Username;

/// Lifecycle hooks for roster and session events.
///
/// Mirrors the shape of the teacher's `ServiceHandler`/`Observer` traits:
/// every method has a logging default, so a deployment that wants metrics
/// or webhook fan-out can override individual hooks without touching the
/// session code that calls them. The bundled [`LogObserver`] only logs.
pub trait Observer: Send + Sync {
    fn on_authenticated(&self, addr: &SocketAddr, username: &Username) {
        log::info!("session authenticated: addr={addr}, user={username:?}");
    }

    fn on_auth_rejected(&self, addr: &SocketAddr) {
        log::warn!("session rejected: addr={addr}, reason=bad credentials");
    }

    fn on_key_exchange(&self, addr: &SocketAddr, username: &Username) {
        log::info!("key published: addr={addr}, user={username:?}");
    }

    fn on_message_forwarded(&self, sender: &Username, recipient: &Username) {
        log::debug!("message forwarded: sender={sender:?}, recipient={recipient:?}");
    }

    fn on_message_dropped(&self, sender: &Username, recipient: &Username) {
        log::warn!("message dropped: sender={sender:?}, recipient={recipient:?}, reason=unknown recipient");
    }

    fn on_disconnect(&self, addr: &SocketAddr, username: Option<&Username>) {
        match username {
            Some(name) => log::info!("session disconnected: addr={addr}, user={name:?}"),
            None => log::info!("session disconnected before authentication: addr={addr}"),
        }
    }
}

/// The default [`Observer`]: every hook only logs via the `log` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl Observer for LogObserver {}
