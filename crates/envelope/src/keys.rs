//! secp256k1 key material and the shared secret derived from it.
//!
//! Keys cross API boundaries as hex, optionally `0x`-prefixed. Parsing
//! validates length and curve membership so that the key-agreement layer only
//! ever sees well-formed keys.

use std::fmt;

use aes_gcm::aead::OsRng;
use common::EnvelopeError;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Byte length of a private scalar.
pub const PRIVATE_KEY_LEN: usize = 32;

/// Byte length of a compressed SEC1 public point.
pub const COMPRESSED_PUBLIC_KEY_LEN: usize = 33;

/// Byte length of an uncompressed SEC1 public point.
pub const UNCOMPRESSED_PUBLIC_KEY_LEN: usize = 65;

/// Byte length of a [`SharedSecret`].
pub const SHARED_SECRET_LEN: usize = 32;

fn strip_hex_prefix(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// A secp256k1 private scalar in `[1, n-1]`.
#[derive(Clone)]
pub struct PrivateKey(k256::SecretKey);

impl PrivateKey {
    /// Generate a fresh key from the OS CSPRNG.
    pub fn generate() -> Self {
        Self(k256::SecretKey::random(&mut OsRng))
    }

    /// Parse a 32-byte scalar.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::InvalidKeyMaterial`] if `bytes` is not 32 bytes
    /// long or is zero or not below the curve order.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        if bytes.len() != PRIVATE_KEY_LEN {
            return Err(EnvelopeError::InvalidKeyMaterial(format!(
                "private key must be {PRIVATE_KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        k256::SecretKey::from_slice(bytes)
            .map(Self)
            .map_err(|_| EnvelopeError::InvalidKeyMaterial("private scalar out of range".into()))
    }

    /// Parse a hex-encoded scalar, with or without a `0x` prefix.
    pub fn from_hex(hex_str: &str) -> Result<Self, EnvelopeError> {
        let bytes = Zeroizing::new(
            hex::decode(strip_hex_prefix(hex_str))
                .map_err(|e| EnvelopeError::InvalidKeyMaterial(format!("private key hex: {e}")))?,
        );
        Self::from_bytes(&bytes)
    }

    /// Lowercase hex of the scalar, `0x`-prefixed.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(format!("0x{}", hex::encode(self.0.to_bytes())))
    }

    /// The matching public point.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.public_key())
    }

    pub(crate) fn as_inner(&self) -> &k256::SecretKey {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey([REDACTED])")
    }
}

/// A validated secp256k1 public point.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(k256::PublicKey);

impl PublicKey {
    /// Parse a SEC1 point, compressed (33 bytes) or uncompressed (65 bytes).
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::InvalidKeyMaterial`] on any other length or if
    /// the bytes do not describe a point on the curve.
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        if bytes.len() != COMPRESSED_PUBLIC_KEY_LEN && bytes.len() != UNCOMPRESSED_PUBLIC_KEY_LEN
        {
            return Err(EnvelopeError::InvalidKeyMaterial(format!(
                "public key must be {COMPRESSED_PUBLIC_KEY_LEN} or \
                 {UNCOMPRESSED_PUBLIC_KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        k256::PublicKey::from_sec1_bytes(bytes).map(Self).map_err(|_| {
            EnvelopeError::InvalidKeyMaterial("public key is not a curve point".into())
        })
    }

    /// Parse a hex-encoded SEC1 point, with or without a `0x` prefix.
    pub fn from_hex(hex_str: &str) -> Result<Self, EnvelopeError> {
        let bytes = hex::decode(strip_hex_prefix(hex_str))
            .map_err(|e| EnvelopeError::InvalidKeyMaterial(format!("public key hex: {e}")))?;
        Self::from_sec1_bytes(&bytes)
    }

    /// Compressed SEC1 encoding.
    pub fn to_compressed(&self) -> Vec<u8> {
        self.0.to_encoded_point(true).as_bytes().to_vec()
    }

    /// Lowercase hex of the compressed point, without prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_compressed())
    }

    pub(crate) fn as_inner(&self) -> &k256::PublicKey {
        &self.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// 32-byte output of key agreement, used directly as the AES-256 key.
///
/// Zeroed on drop and never printed.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; SHARED_SECRET_LEN]);

impl SharedSecret {
    pub(crate) fn new(bytes: [u8; SHARED_SECRET_LEN]) -> Self {
        Self(bytes)
    }

    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; SHARED_SECRET_LEN] {
        &self.0
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret([REDACTED])")
    }
}
