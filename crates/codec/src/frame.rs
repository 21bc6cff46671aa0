use std::fmt;

use bytes::{BufMut, BytesMut};

use crate::header::{HEADER_LEN, Header, HeaderError};
use crate::identity::{PASSWORD_LEN, PUBLIC_KEY_LEN, USERNAME_LEN, Password, PublicKey, Username};

/// Maximum ciphertext a single `Message` frame can carry.
pub const MESSAGE_DATA_LEN: usize = 2048;

/// The type byte identifying a frame's payload layout.
///
/// Values match the wire encoding exactly; `TryFrom<u8>`/`Into<u8>` are
/// written by hand (rather than derived) so the mapping is pinned down and
/// doc-tested rather than left to an enum's discriminant order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    AuthRequest,
    AuthResponse,
    KeyExchange,
    Message,
    MessageAck,
    Disconnect,
}

impl FrameKind {
    /// The fixed payload size, in bytes, that follows the header for this
    /// frame type.
    pub fn payload_len(self) -> usize {
        match self {
            Self::AuthRequest => AuthRequest::LEN,
            Self::AuthResponse => AuthResponse::LEN,
            Self::KeyExchange => KeyExchange::LEN,
            Self::Message => Message::LEN,
            Self::MessageAck => MessageAck::LEN,
            Self::Disconnect => Disconnect::LEN,
        }
    }
}

/// ```
/// use chat_relay_codec::FrameKind;
///
/// assert_eq!(FrameKind::try_from(0x01u8).unwrap(), FrameKind::AuthRequest);
/// assert_eq!(FrameKind::try_from(0x06u8).unwrap(), FrameKind::Disconnect);
/// assert!(FrameKind::try_from(0x00u8).is_err());
/// assert!(FrameKind::try_from(0x07u8).is_err());
/// ```
impl TryFrom<u8> for FrameKind {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0x01 => Self::AuthRequest,
            0x02 => Self::AuthResponse,
            0x03 => Self::KeyExchange,
            0x04 => Self::Message,
            0x05 => Self::MessageAck,
            0x06 => Self::Disconnect,
            _ => return Err(()),
        })
    }
}

/// ```
/// use chat_relay_codec::FrameKind;
///
/// let byte: u8 = FrameKind::KeyExchange.into();
/// assert_eq!(byte, 0x03);
/// ```
impl From<FrameKind> for u8 {
    fn from(value: FrameKind) -> Self {
        match value {
            FrameKind::AuthRequest => 0x01,
            FrameKind::AuthResponse => 0x02,
            FrameKind::KeyExchange => 0x03,
            FrameKind::Message => 0x04,
            FrameKind::MessageAck => 0x05,
            FrameKind::Disconnect => 0x06,
        }
    }
}

#[derive(Debug)]
pub enum FrameError {
    Header(HeaderError),
    LengthMismatch { expected: usize, actual: usize },
    InvalidStatus(u8),
    InvalidReason(u8),
    Truncated,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header(e) => write!(f, "{e}"),
            Self::LengthMismatch { expected, actual } => {
                write!(f, "payload length mismatch: expected {expected}, got {actual}")
            }
            Self::InvalidStatus(b) => write!(f, "invalid auth status byte: 0x{b:02x}"),
            Self::InvalidReason(b) => write!(f, "invalid disconnect reason byte: 0x{b:02x}"),
            Self::Truncated => write!(f, "frame truncated before its declared length"),
        }
    }
}

impl std::error::Error for FrameError {}

impl From<HeaderError> for FrameError {
    fn from(value: HeaderError) -> Self {
        Self::Header(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Success,
    Failure,
}

impl TryFrom<u8> for AuthStatus {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::Success),
            0x01 => Ok(Self::Failure),
            other => Err(FrameError::InvalidStatus(other)),
        }
    }
}

impl From<AuthStatus> for u8 {
    fn from(value: AuthStatus) -> Self {
        match value {
            AuthStatus::Success => 0x00,
            AuthStatus::Failure => 0x01,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    User,
    Server,
}

impl TryFrom<u8> for DisconnectReason {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::User),
            0x01 => Ok(Self::Server),
            other => Err(FrameError::InvalidReason(other)),
        }
    }
}

impl From<DisconnectReason> for u8 {
    fn from(value: DisconnectReason) -> Self {
        match value {
            DisconnectReason::User => 0x00,
            DisconnectReason::Server => 0x01,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AuthRequest {
    pub username: Username,
    pub password: Password,
}

impl AuthRequest {
    pub const LEN: usize = USERNAME_LEN + PASSWORD_LEN;

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(self.username.as_bytes());
        buf.put_slice(self.password.as_bytes());
    }

    fn decode(bytes: &[u8]) -> Self {
        let mut username = [0u8; USERNAME_LEN];
        username.copy_from_slice(&bytes[..USERNAME_LEN]);

        let mut password = [0u8; PASSWORD_LEN];
        password.copy_from_slice(&bytes[USERNAME_LEN..Self::LEN]);

        Self {
            username: Username::from_bytes(username),
            password: Password::from_bytes(password),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AuthResponse {
    pub status: AuthStatus,
}

impl AuthResponse {
    pub const LEN: usize = 1;

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.status.into());
    }

    fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        Ok(Self {
            status: AuthStatus::try_from(bytes[0])?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct KeyExchange {
    pub username: Username,
    pub key: PublicKey,
}

impl KeyExchange {
    pub const LEN: usize = USERNAME_LEN + PUBLIC_KEY_LEN;

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(self.username.as_bytes());
        buf.put_slice(self.key.as_bytes());
    }

    fn decode(bytes: &[u8]) -> Self {
        let mut username = [0u8; USERNAME_LEN];
        username.copy_from_slice(&bytes[..USERNAME_LEN]);

        let mut key = [0u8; PUBLIC_KEY_LEN];
        key.copy_from_slice(&bytes[USERNAME_LEN..Self::LEN]);

        Self {
            username: Username::from_bytes(username),
            key: PublicKey::from_bytes(key),
        }
    }
}

/// A single forwarded ciphertext. `data` is zero-padded to
/// [`MESSAGE_DATA_LEN`]; `text_len` records how much of it is meaningful but
/// is advisory only — see [`Message::ciphertext`].
#[derive(Clone, Copy)]
pub struct Message {
    pub timestamp: u32,
    pub sender: Username,
    pub recipient: Username,
    pub text_len: u16,
    data: [u8; MESSAGE_DATA_LEN],
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("timestamp", &self.timestamp)
            .field("sender", &self.sender)
            .field("recipient", &self.recipient)
            .field("text_len", &self.text_len)
            .field("ciphertext_len", &self.ciphertext().len())
            .finish()
    }
}

impl Message {
    pub const LEN: usize = 4 + USERNAME_LEN + USERNAME_LEN + 2 + MESSAGE_DATA_LEN;

    /// Builds a message frame, zero-padding `ciphertext` to the field width.
    /// Returns `None` if the ciphertext does not fit.
    pub fn new(timestamp: u32, sender: Username, recipient: Username, ciphertext: &[u8]) -> Option<Self> {
        if ciphertext.len() > MESSAGE_DATA_LEN {
            return None;
        }

        let mut data = [0u8; MESSAGE_DATA_LEN];
        data[..ciphertext.len()].copy_from_slice(ciphertext);

        Some(Self {
            timestamp,
            sender,
            recipient,
            text_len: ciphertext.len() as u16,
            data,
        })
    }

    /// The meaningful ciphertext bytes: everything before the first zero
    /// byte in `data`, or the whole field if none is found.
    ///
    /// `text_len` is not consulted: it is advisory only, per the protocol's
    /// decision to derive the real boundary from the payload rather than
    /// trust a field the original implementation never checked. This is the
    /// same first-zero-byte rule the wire format uses for [`PublicKey`], and
    /// it inherits the same fragility: binary ciphertext that happens to
    /// contain an early zero byte is truncated early. The protocol does not
    /// define a way around this (see the open question on `text_len`).
    pub fn ciphertext(&self) -> &[u8] {
        let end = self.data.iter().position(|&b| b == 0).unwrap_or(MESSAGE_DATA_LEN);
        &self.data[..end]
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.timestamp);
        buf.put_slice(self.sender.as_bytes());
        buf.put_slice(self.recipient.as_bytes());
        buf.put_u16(self.text_len);
        buf.put_slice(&self.data);
    }

    fn decode(bytes: &[u8]) -> Self {
        let timestamp = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);

        let mut sender = [0u8; USERNAME_LEN];
        sender.copy_from_slice(&bytes[4..4 + USERNAME_LEN]);

        let mut recipient = [0u8; USERNAME_LEN];
        recipient.copy_from_slice(&bytes[4 + USERNAME_LEN..4 + USERNAME_LEN * 2]);

        let text_len_at = 4 + USERNAME_LEN * 2;
        let text_len = u16::from_be_bytes([bytes[text_len_at], bytes[text_len_at + 1]]);

        let mut data = [0u8; MESSAGE_DATA_LEN];
        data.copy_from_slice(&bytes[text_len_at + 2..Self::LEN]);

        Self {
            timestamp,
            sender: Username::from_bytes(sender),
            recipient: Username::from_bytes(recipient),
            text_len,
            data,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MessageAck {
    pub sequence: u32,
}

impl MessageAck {
    pub const LEN: usize = 4;

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.sequence);
    }

    fn decode(bytes: &[u8]) -> Self {
        Self {
            sequence: u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Disconnect {
    pub reason: DisconnectReason,
}

impl Disconnect {
    pub const LEN: usize = 1;

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.reason.into());
    }

    fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        Ok(Self {
            reason: DisconnectReason::try_from(bytes[0])?,
        })
    }
}

#[derive(Debug, Clone)]
pub enum Frame {
    AuthRequest(AuthRequest),
    AuthResponse(AuthResponse),
    KeyExchange(KeyExchange),
    Message(Message),
    MessageAck(MessageAck),
    Disconnect(Disconnect),
}

impl Frame {
    pub fn kind(&self) -> FrameKind {
        match self {
            Self::AuthRequest(_) => FrameKind::AuthRequest,
            Self::AuthResponse(_) => FrameKind::AuthResponse,
            Self::KeyExchange(_) => FrameKind::KeyExchange,
            Self::Message(_) => FrameKind::Message,
            Self::MessageAck(_) => FrameKind::MessageAck,
            Self::Disconnect(_) => FrameKind::Disconnect,
        }
    }

    /// Encodes the header and payload into a single contiguous buffer ready
    /// to write to the socket.
    ///
    /// # Test
    ///
    /// ```
    /// use chat_relay_codec::{AuthRequest, Frame, Header, identity::{Username, Password}};
    ///
    /// let frame = Frame::AuthRequest(AuthRequest {
    ///     username: Username::new("alice"),
    ///     password: Password::new("hunter2"),
    /// });
    ///
    /// let bytes = frame.encode(1);
    /// let header = Header::decode(bytes[..8].try_into().unwrap()).unwrap();
    /// assert_eq!(header.sequence, 1);
    ///
    /// let decoded = Frame::decode(&header, &bytes[8..]).unwrap();
    /// match decoded {
    ///     Frame::AuthRequest(req) => assert_eq!(req.username.as_str().unwrap(), "alice"),
    ///     _ => panic!("wrong frame kind"),
    /// }
    /// ```
    pub fn encode(&self, sequence: u32) -> BytesMut {
        let payload_len = self.kind().payload_len();
        let header = Header::new(self.kind(), payload_len as u16, sequence);

        let mut buf = BytesMut::with_capacity(HEADER_LEN + payload_len);
        buf.put_slice(&header.encode());

        match self {
            Self::AuthRequest(p) => p.encode(&mut buf),
            Self::AuthResponse(p) => p.encode(&mut buf),
            Self::KeyExchange(p) => p.encode(&mut buf),
            Self::Message(p) => p.encode(&mut buf),
            Self::MessageAck(p) => p.encode(&mut buf),
            Self::Disconnect(p) => p.encode(&mut buf),
        }

        buf
    }

    /// Decodes a payload of the type named by `header`. The caller is
    /// expected to have already read exactly `header.kind.payload_len()`
    /// bytes following the header off the wire.
    pub fn decode(header: &Header, payload: &[u8]) -> Result<Self, FrameError> {
        let expected = header.kind.payload_len();

        if payload.len() < expected {
            return Err(FrameError::Truncated);
        }

        if header.length as usize != expected {
            return Err(FrameError::LengthMismatch {
                expected,
                actual: header.length as usize,
            });
        }

        Ok(match header.kind {
            FrameKind::AuthRequest => Self::AuthRequest(AuthRequest::decode(payload)),
            FrameKind::AuthResponse => Self::AuthResponse(AuthResponse::decode(payload)?),
            FrameKind::KeyExchange => Self::KeyExchange(KeyExchange::decode(payload)),
            FrameKind::Message => Self::Message(Message::decode(payload)),
            FrameKind::MessageAck => Self::MessageAck(MessageAck::decode(payload)),
            FrameKind::Disconnect => Self::Disconnect(Disconnect::decode(payload)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(frame: Frame) {
        let bytes = frame.encode(5);
        let header = Header::decode(bytes[..HEADER_LEN].try_into().unwrap()).unwrap();
        let decoded = Frame::decode(&header, &bytes[HEADER_LEN..]).unwrap();
        assert_eq!(decoded.kind(), frame.kind());
    }

    #[test]
    fn every_frame_kind_round_trips() {
        round_trip(Frame::AuthRequest(AuthRequest {
            username: Username::new("alice"),
            password: Password::new("swordfish"),
        }));

        round_trip(Frame::AuthResponse(AuthResponse {
            status: AuthStatus::Success,
        }));

        round_trip(Frame::KeyExchange(KeyExchange {
            username: Username::new("bob"),
            key: PublicKey::from_der(&[1, 2, 3, 4]).unwrap(),
        }));

        round_trip(Frame::Message(
            Message::new(1_700_000_000, Username::new("alice"), Username::new("bob"), b"ciphertext")
                .unwrap(),
        ));

        round_trip(Frame::MessageAck(MessageAck { sequence: 99 }));

        round_trip(Frame::Disconnect(Disconnect {
            reason: DisconnectReason::User,
        }));
    }

    #[test]
    fn message_ciphertext_ignores_text_len_and_stops_at_first_zero() {
        let mut message =
            Message::new(0, Username::new("a"), Username::new("b"), b"hello").unwrap();
        message.text_len = 9999;
        assert_eq!(message.ciphertext(), b"hello");
    }

    #[test]
    fn decode_rejects_length_mismatch() {
        let frame = Frame::Disconnect(Disconnect {
            reason: DisconnectReason::Server,
        });

        let bytes = frame.encode(0);
        let mut header = Header::decode(bytes[..HEADER_LEN].try_into().unwrap()).unwrap();
        header.length = 5;

        assert!(matches!(
            Frame::decode(&header, &bytes[HEADER_LEN..]),
            Err(FrameError::LengthMismatch { expected: 1, actual: 5 })
        ));
    }

    #[test]
    fn decode_rejects_invalid_enum_bytes() {
        let frame = Frame::AuthResponse(AuthResponse {
            status: AuthStatus::Success,
        });

        let bytes = frame.encode(0);
        let header = Header::decode(bytes[..HEADER_LEN].try_into().unwrap()).unwrap();
        let mut payload = bytes[HEADER_LEN..].to_vec();
        payload[0] = 0xaa;

        assert!(matches!(
            Frame::decode(&header, &payload),
            Err(FrameError::InvalidStatus(0xaa))
        ));
    }

    #[test]
    fn decode_rejects_truncated_payload() {
        let frame = Frame::MessageAck(MessageAck { sequence: 1 });
        let bytes = frame.encode(0);
        let header = Header::decode(bytes[..HEADER_LEN].try_into().unwrap()).unwrap();

        assert!(matches!(
            Frame::decode(&header, &bytes[HEADER_LEN..HEADER_LEN + 2]),
            Err(FrameError::Truncated)
        ));
    }
}
