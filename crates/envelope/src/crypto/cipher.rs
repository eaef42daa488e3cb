//! AES-256-GCM encryption and decryption of message payloads.
//!
//! The cipher output follows the standard AES-GCM convention: ciphertext with
//! the 16-byte authentication tag appended. The envelope codec splits the two
//! apart for the wire; see [`Sealed::split_tag`].
//!
//! **Nonces are never caller-supplied.** Each [`encrypt`] draws 96 fresh bits
//! from the OS CSPRNG. GCM nonce reuse under one key breaks both
//! confidentiality and authentication.

use aes_gcm::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng, Payload},
    Aes256Gcm, Nonce,
};
use common::EnvelopeError;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of an AES-GCM authentication tag.
pub const TAG_LEN: usize = 16;

/// Output of [`encrypt`]: the nonce and `ciphertext || tag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    /// Raw nonce bytes.
    pub nonce: [u8; NONCE_LEN],
    /// Raw ciphertext + authentication tag bytes.
    pub ciphertext: Vec<u8>,
}

impl Sealed {
    /// Split into the encrypted payload and the trailing tag.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::EncryptionFailure`] if the buffer is shorter
    /// than a tag, which no successful [`encrypt`] produces.
    pub fn split_tag(&self) -> Result<(&[u8], [u8; TAG_LEN]), EnvelopeError> {
        let body_len = self
            .ciphertext
            .len()
            .checked_sub(TAG_LEN)
            .ok_or_else(|| {
                EnvelopeError::EncryptionFailure("cipher output shorter than tag".into())
            })?;
        let (body, tag_bytes) = self.ciphertext.split_at(body_len);
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(tag_bytes);
        Ok((body, tag))
    }
}

/// Encrypt `plaintext` under `key` with a fresh random nonce.
///
/// # Errors
///
/// Returns [`EnvelopeError::InvalidKeyMaterial`] if `key` is not [`KEY_LEN`] bytes.
/// Returns [`EnvelopeError::EncryptionFailure`] on an internal AEAD error.
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> Result<Sealed, EnvelopeError> {
    encrypt_with_aad(key, plaintext, &[])
}

/// Like [`encrypt`], additionally authenticating `aad`.
pub fn encrypt_with_aad(key: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Sealed, EnvelopeError> {
    let cipher = build_cipher(key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, Payload { msg: plaintext, aad })
        .map_err(|_| EnvelopeError::EncryptionFailure("aead seal failed".into()))?;

    Ok(Sealed {
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Decrypt `ciphertext || tag` produced under `key` and `nonce`.
///
/// # Errors
///
/// Returns [`EnvelopeError::InvalidKeyMaterial`] if `key` is not [`KEY_LEN`] bytes.
/// Returns [`EnvelopeError::DecryptionFailure`] if `ciphertext` is shorter than a tag.
/// Returns [`EnvelopeError::AuthenticationFailure`] if the tag does not verify.
pub fn decrypt(
    key: &[u8],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
) -> Result<Vec<u8>, EnvelopeError> {
    decrypt_with_aad(key, nonce, ciphertext, &[])
}

/// Like [`decrypt`], additionally verifying `aad`.
pub fn decrypt_with_aad(
    key: &[u8],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, EnvelopeError> {
    let cipher = build_cipher(key)?;
    if ciphertext.len() < TAG_LEN {
        return Err(EnvelopeError::DecryptionFailure(format!(
            "ciphertext is {} bytes, shorter than the {TAG_LEN}-byte tag",
            ciphertext.len()
        )));
    }
    // With a valid key, a 96-bit nonce and a tag-sized input, tag
    // verification is the only remaining failure mode.
    cipher
        .decrypt(Nonce::from_slice(nonce), Payload { msg: ciphertext, aad })
        .map_err(|_| EnvelopeError::AuthenticationFailure)
}

fn build_cipher(key: &[u8]) -> Result<Aes256Gcm, EnvelopeError> {
    if key.len() != KEY_LEN {
        return Err(EnvelopeError::InvalidKeyMaterial(format!(
            "AEAD key must be {KEY_LEN} bytes, got {}",
            key.len()
        )));
    }
    Aes256Gcm::new_from_slice(key)
        .map_err(|_| EnvelopeError::InvalidKeyMaterial("AEAD key rejected".into()))
}
