use std::fmt;

use codec::{FrameError, HeaderError};

use crate::crypto::CryptoError;

/// Errors that end the client session. Every variant is terminal; the
/// taxonomy exists so `main` can log a precise reason and pick an exit
/// code, mirroring the server's `SessionError`.
#[derive(Debug)]
pub enum ClientError {
    Transport(std::io::Error),
    Decode(FrameError),
    /// A frame arrived in a state that does not accept it.
    StateViolation { state: &'static str, frame: &'static str },
    /// The server rejected our credentials.
    AuthRejected,
    /// Key generation failed at startup; nothing to retry.
    Crypto(CryptoError),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::Decode(e) => write!(f, "decode error: {e}"),
            Self::StateViolation { state, frame } => {
                write!(f, "{frame} frame is not valid in state {state}")
            }
            Self::AuthRejected => write!(f, "authentication rejected"),
            Self::Crypto(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<std::io::Error> for ClientError {
    fn from(value: std::io::Error) -> Self {
        Self::Transport(value)
    }
}

impl From<FrameError> for ClientError {
    fn from(value: FrameError) -> Self {
        Self::Decode(value)
    }
}

impl From<HeaderError> for ClientError {
    fn from(value: HeaderError) -> Self {
        Self::Decode(FrameError::from(value))
    }
}

impl From<CryptoError> for ClientError {
    fn from(value: CryptoError) -> Self {
        Self::Crypto(value)
    }
}
