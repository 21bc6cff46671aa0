//! Keypair generation and per-message RSA encryption.
//!
//! PKCS#1 v1.5 over a 2048-bit key, matching the original implementation's
//! `rsa.GenerateKey` / `x509.MarshalPKIXPublicKey` / `rsa.EncryptPKCS1v15`
//! sequence. The wire only ever carries the SPKI DER encoding of the public
//! key, zero-padded to [`codec::PUBLIC_KEY_LEN`].

use std::fmt;

use codec::PublicKey;
use rand::rngs::OsRng;
use rsa::{
    pkcs8::{DecodePublicKey, EncodePublicKey},
    Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey,
};

/// RSA modulus size used for every generated keypair.
pub const KEY_BITS: usize = 2048;

/// Maximum plaintext bytes a single PKCS#1 v1.5 encryption under a 2048-bit
/// key can carry (`256 - 11` bytes of padding overhead). The protocol does
/// not fragment messages, so longer input must be rejected before this
/// module ever sees it.
pub const MAX_PLAINTEXT_LEN: usize = KEY_BITS / 8 - 11;

#[derive(Debug)]
pub enum CryptoError {
    KeyGeneration(rsa::Error),
    Encoding(rsa::pkcs8::spki::Error),
    /// The SPKI DER encoding of a freshly generated key did not fit in the
    /// wire's fixed 512-byte field. Not expected to happen for a 2048-bit
    /// RSA key, but the field width is a protocol constant and this module
    /// does not assume it.
    KeyTooLarge,
    InvalidPeerKey,
    Encrypt(rsa::Error),
    Decrypt(rsa::Error),
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyGeneration(e) => write!(f, "key generation failed: {e}"),
            Self::Encoding(e) => write!(f, "public key encoding failed: {e}"),
            Self::KeyTooLarge => write!(f, "encoded public key does not fit the wire field"),
            Self::InvalidPeerKey => write!(f, "peer public key is not a valid RSA SPKI key"),
            Self::Encrypt(e) => write!(f, "encryption failed: {e}"),
            Self::Decrypt(e) => write!(f, "decryption failed: {e}"),
        }
    }
}

impl std::error::Error for CryptoError {}

/// This process's own RSA keypair. The private half never leaves this
/// struct and is never serialized.
pub struct Keypair {
    private: RsaPrivateKey,
    public_wire: PublicKey,
}

impl Keypair {
    /// Generates a fresh 2048-bit keypair. Fatal at client startup if it
    /// fails; there is nothing to retry.
    pub fn generate() -> Result<Self, CryptoError> {
        let private = RsaPrivateKey::new(&mut OsRng, KEY_BITS).map_err(CryptoError::KeyGeneration)?;
        let public = RsaPublicKey::from(&private);

        let der = public.to_public_key_der().map_err(CryptoError::Encoding)?;
        let public_wire = PublicKey::from_der(der.as_bytes()).ok_or(CryptoError::KeyTooLarge)?;

        Ok(Self { private, public_wire })
    }

    /// The wire-ready, zero-padded public key to publish via `KeyExchange`.
    pub fn public_wire(&self) -> PublicKey {
        self.public_wire
    }

    /// Decrypts a ciphertext produced by a peer encrypting to our public
    /// key. A failure here is logged by the caller and the inbound message
    /// is skipped; the session continues.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.private.decrypt(Pkcs1v15Encrypt, ciphertext).map_err(CryptoError::Decrypt)
    }
}

/// Encrypts `plaintext` to `peer_key`, which must be the logical DER bytes
/// recovered from a wire [`PublicKey`] (see [`PublicKey::der`]).
pub fn encrypt_to(peer_key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let public = RsaPublicKey::from_public_key_der(peer_key).map_err(|_| CryptoError::InvalidPeerKey)?;
    public.encrypt(&mut OsRng, Pkcs1v15Encrypt, plaintext).map_err(CryptoError::Encrypt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt_round_trips() {
        let keypair = Keypair::generate().unwrap();
        let ciphertext = encrypt_to(keypair.public_wire().der(), b"hi").unwrap();
        let plaintext = keypair.decrypt(&ciphertext).unwrap();
        assert_eq!(plaintext, b"hi");
    }

    #[test]
    fn encrypt_rejects_garbage_peer_key() {
        assert!(encrypt_to(b"not a key", b"hi").is_err());
    }

    #[test]
    fn max_plaintext_len_is_245_bytes_for_a_2048_bit_key() {
        assert_eq!(MAX_PLAINTEXT_LEN, 245);
    }
}
