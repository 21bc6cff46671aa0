use std::fmt;

use codec::{FrameError, HeaderError};
use service::RosterError;

/// Errors local to a single server session. None of these propagate beyond
/// the connection task that produced them; the taxonomy exists so the task
/// can log a precise reason before tearing the connection down.
#[derive(Debug)]
pub enum SessionError {
    /// The transport itself failed (read/write error, or closed mid-frame).
    Transport(std::io::Error),
    /// A frame could not be decoded: unknown type, length mismatch, or a
    /// truncated/invalid payload.
    Decode(FrameError),
    /// A frame arrived in a state that does not accept it.
    StateViolation { state: &'static str, frame: &'static str },
    /// Bad credentials on `AuthRequest`.
    Unauthorized,
    /// A `Message` whose declared sender does not match the authenticated
    /// connection, or whose recipient is not on the roster.
    UnknownRecipient,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::Decode(e) => write!(f, "decode error: {e}"),
            Self::StateViolation { state, frame } => {
                write!(f, "{frame} frame is not valid in state {state}")
            }
            Self::Unauthorized => write!(f, "authentication rejected"),
            Self::UnknownRecipient => write!(f, "recipient is not reachable"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<std::io::Error> for SessionError {
    fn from(value: std::io::Error) -> Self {
        Self::Transport(value)
    }
}

impl From<FrameError> for SessionError {
    fn from(value: FrameError) -> Self {
        Self::Decode(value)
    }
}

impl From<HeaderError> for SessionError {
    fn from(value: HeaderError) -> Self {
        Self::Decode(FrameError::from(value))
    }
}

impl From<RosterError> for SessionError {
    fn from(value: RosterError) -> Self {
        match value {
            RosterError::UnknownRecipient => Self::UnknownRecipient,
            RosterError::NotAuthenticated => Self::Unauthorized,
        }
    }
}
