use std::fmt;

use crate::frame::FrameKind;

/// Every frame on the wire begins with this 8-byte header.
pub const HEADER_LEN: usize = 8;

#[derive(Debug)]
pub enum HeaderError {
    UnknownType(u8),
}

impl fmt::Display for HeaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownType(ty) => write!(f, "unknown frame type: 0x{ty:02x}"),
        }
    }
}

impl std::error::Error for HeaderError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub kind: FrameKind,
    pub length: u16,
    pub sequence: u32,
}

impl Header {
    pub fn new(kind: FrameKind, length: u16, sequence: u32) -> Self {
        Self {
            version: crate::VERSION,
            kind,
            length,
            sequence,
        }
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0] = self.version;
        buf[1] = self.kind.into();
        buf[2..4].copy_from_slice(&self.length.to_be_bytes());
        buf[4..8].copy_from_slice(&self.sequence.to_be_bytes());
        buf
    }

    pub fn decode(bytes: &[u8; HEADER_LEN]) -> Result<Self, HeaderError> {
        let kind = FrameKind::try_from(bytes[1]).map_err(|_| HeaderError::UnknownType(bytes[1]))?;

        Ok(Self {
            version: bytes[0],
            kind,
            length: u16::from_be_bytes([bytes[2], bytes[3]]),
            sequence: u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        })
    }
}
