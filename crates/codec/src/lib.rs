//! Wire codec for the chat relay protocol.
//!
//! Every frame is an 8-byte header followed by a payload whose size is a
//! pure function of the header's type byte. There is no independent length
//! prefix: `length` is carried for sanity-checking but the real payload
//! width always comes from [`FrameKind::payload_len`].

pub mod frame;
pub mod header;
pub mod identity;

pub use frame::{
    AuthRequest, AuthResponse, AuthStatus, Disconnect, DisconnectReason, Frame, FrameError,
    FrameKind, KeyExchange, Message, MessageAck, MESSAGE_DATA_LEN,
};
pub use header::{Header, HeaderError, HEADER_LEN};
pub use identity::{Password, PublicKey, Username, PASSWORD_LEN, PUBLIC_KEY_LEN, USERNAME_LEN};

/// Protocol version carried in every header.
pub const VERSION: u8 = 1;
