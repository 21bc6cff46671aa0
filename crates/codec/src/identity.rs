use std::fmt;

/// Width in bytes of a zero-padded username field.
pub const USERNAME_LEN: usize = 32;

/// Width in bytes of a zero-padded password field.
pub const PASSWORD_LEN: usize = 32;

/// Width in bytes of a zero-padded SPKI-DER public key field.
pub const PUBLIC_KEY_LEN: usize = 512;

/// A zero-padded 32-byte username.
///
/// The logical value is the prefix before the first zero byte; the rest of
/// the field is padding, not part of the name.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Username([u8; USERNAME_LEN]);

impl Username {
    pub fn new(name: &str) -> Self {
        Self::from_slice(name.as_bytes())
    }

    pub fn from_slice(name: &[u8]) -> Self {
        let mut bytes = [0u8; USERNAME_LEN];
        let len = name.len().min(USERNAME_LEN);
        bytes[..len].copy_from_slice(&name[..len]);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; USERNAME_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; USERNAME_LEN] {
        &self.0
    }

    /// The bytes before the first zero byte.
    pub fn trimmed(&self) -> &[u8] {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(USERNAME_LEN);
        &self.0[..end]
    }

    pub fn as_str(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(self.trimmed())
    }
}

impl fmt::Debug for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Ok(s) => write!(f, "Username({s:?})"),
            Err(_) => write!(f, "Username({:?})", self.trimmed()),
        }
    }
}

/// A zero-padded 32-byte password. `Debug` deliberately never prints the
/// contents.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Password([u8; PASSWORD_LEN]);

impl Password {
    pub fn new(password: &str) -> Self {
        Self::from_slice(password.as_bytes())
    }

    pub fn from_slice(password: &[u8]) -> Self {
        let mut bytes = [0u8; PASSWORD_LEN];
        let len = password.len().min(PASSWORD_LEN);
        bytes[..len].copy_from_slice(&password[..len]);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; PASSWORD_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PASSWORD_LEN] {
        &self.0
    }

    pub fn trimmed(&self) -> &[u8] {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(PASSWORD_LEN);
        &self.0[..end]
    }

    pub fn as_str(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(self.trimmed())
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Password(REDACTED)")
    }
}

/// A zero-padded 512-byte SPKI-DER-encoded RSA public key.
///
/// An all-zero value is the tombstone: it signals that the named
/// participant has left the roster.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey([u8; PUBLIC_KEY_LEN]);

impl PublicKey {
    pub const TOMBSTONE: Self = Self([0u8; PUBLIC_KEY_LEN]);

    /// Zero-pads a DER-encoded public key. Returns `None` if it is empty or
    /// does not fit in the fixed-width field.
    pub fn from_der(der: &[u8]) -> Option<Self> {
        if der.is_empty() || der.len() > PUBLIC_KEY_LEN {
            return None;
        }

        let mut bytes = [0u8; PUBLIC_KEY_LEN];
        bytes[..der.len()].copy_from_slice(der);
        Some(Self(bytes))
    }

    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }

    /// The logical DER encoding: everything before the first zero byte, or
    /// the whole field if none is found. This mirrors the protocol's literal
    /// length rule rather than trimming trailing padding from the end.
    pub fn der(&self) -> &[u8] {
        if self.is_tombstone() {
            return &[];
        }

        let end = self.0.iter().position(|&b| b == 0).unwrap_or(PUBLIC_KEY_LEN);
        &self.0[..end]
    }

    pub fn is_tombstone(&self) -> bool {
        self.0 == [0u8; PUBLIC_KEY_LEN]
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_tombstone() {
            write!(f, "PublicKey(tombstone)")
        } else {
            write!(f, "PublicKey({} bytes)", self.der().len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_round_trips_through_padding() {
        let name = Username::new("alice");
        assert_eq!(name.as_str().unwrap(), "alice");
        assert_eq!(name.as_bytes().len(), USERNAME_LEN);
    }

    #[test]
    fn username_truncates_past_field_width() {
        let long = "a".repeat(64);
        let name = Username::new(&long);
        assert_eq!(name.trimmed().len(), USERNAME_LEN);
    }

    #[test]
    fn public_key_tombstone_is_all_zero() {
        assert!(PublicKey::TOMBSTONE.is_tombstone());
        assert!(PublicKey::from_der(&[]).is_none());
    }

    #[test]
    fn public_key_der_recovers_original_bytes() {
        let der = vec![0x30u8, 0x82, 0x01, 0x22, 0xff, 0x01];
        let key = PublicKey::from_der(&der).unwrap();
        assert_eq!(key.der(), der.as_slice());
        assert!(!key.is_tombstone());
    }

    #[test]
    fn password_debug_never_prints_contents() {
        let password = Password::new("hunter2");
        assert_eq!(format!("{password:?}"), "Password(REDACTED)");
    }
}
