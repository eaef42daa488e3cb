//! secp256k1 ECDH key agreement.
//!
//! One abstraction ([`KeyAgreement`]) with one backend ([`Secp256k1Agreement`],
//! RustCrypto `k256`). How the shared point becomes key bytes is an explicit
//! [`SecretDerivation`] choice.
//!
//! # Known gaps
//!
//! - [`SecretDerivation::RawX`] uses the shared x-coordinate directly as the
//!   AES key with no KDF.
//! - Static agreement reuses the long-term key pair, so every message between
//!   two parties is encrypted under the same key. Per-message ephemeral keys
//!   (ECDH-ES) are available through [`KeyAgreement::derive_ephemeral`] but are
//!   opt-in, because they change what goes on the wire.

use common::EnvelopeError;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::keys::{PrivateKey, PublicKey, SharedSecret, SHARED_SECRET_LEN};

/// How the ECDH shared point is turned into [`SharedSecret`] bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecretDerivation {
    /// The 32-byte x-coordinate of the shared point.
    #[default]
    RawX,
    /// SHA-256 over the compressed shared point (`0x02|0x03 || x`), as the
    /// libsecp256k1 `ecdh` default computes it.
    Sha256Compressed,
}

/// Derives a symmetric secret from one party's private key and the other's
/// public key.
pub trait KeyAgreement: Send + Sync {
    /// Static-static agreement.
    ///
    /// Symmetric: `derive(A_pub, B_priv) == derive(B_pub, A_priv)`.
    fn derive_shared_secret(
        &self,
        peer_public: &PublicKey,
        local_private: &PrivateKey,
    ) -> Result<SharedSecret, EnvelopeError>;

    /// Ephemeral-static agreement: generates a one-off key pair, agrees with
    /// `peer_public`, and returns the ephemeral public key for the receiver.
    fn derive_ephemeral(
        &self,
        peer_public: &PublicKey,
    ) -> Result<(PublicKey, SharedSecret), EnvelopeError> {
        let ephemeral = PrivateKey::generate();
        let secret = self.derive_shared_secret(peer_public, &ephemeral)?;
        Ok((ephemeral.public_key(), secret))
    }
}

/// The `k256` key-agreement backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Agreement {
    derivation: SecretDerivation,
}

impl Secp256k1Agreement {
    pub fn new(derivation: SecretDerivation) -> Self {
        Self { derivation }
    }
}

impl KeyAgreement for Secp256k1Agreement {
    fn derive_shared_secret(
        &self,
        peer_public: &PublicKey,
        local_private: &PrivateKey,
    ) -> Result<SharedSecret, EnvelopeError> {
        // Both inputs were validated on construction: the scalar is non-zero
        // and below n, the point is on the curve and not the identity.
        let scalar = local_private.as_inner().to_nonzero_scalar();
        let shared = (peer_public.as_inner().to_projective() * *scalar).to_affine();
        let encoded = shared.to_encoded_point(true);
        let compressed = Zeroizing::new(encoded.as_bytes().to_vec());
        if compressed.len() != 1 + SHARED_SECRET_LEN {
            return Err(EnvelopeError::InvalidKeyMaterial(
                "shared point is the identity".into(),
            ));
        }

        let mut out = [0u8; SHARED_SECRET_LEN];
        match self.derivation {
            SecretDerivation::RawX => out.copy_from_slice(&compressed[1..]),
            SecretDerivation::Sha256Compressed => {
                out.copy_from_slice(&Sha256::digest(compressed.as_slice()));
            }
        }
        Ok(SharedSecret::new(out))
    }
}

/// Derive the shared secret with the default backend ([`SecretDerivation::RawX`]).
pub fn derive_shared_secret(
    peer_public: &PublicKey,
    local_private: &PrivateKey,
) -> Result<SharedSecret, EnvelopeError> {
    Secp256k1Agreement::default().derive_shared_secret(peer_public, local_private)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (PrivateKey, PublicKey) {
        let private = PrivateKey::generate();
        let public = private.public_key();
        (private, public)
    }

    #[test]
    fn agreement_is_symmetric() {
        for _ in 0..16 {
            let (a_priv, a_pub) = pair();
            let (b_priv, b_pub) = pair();
            let ab = derive_shared_secret(&b_pub, &a_priv).unwrap();
            let ba = derive_shared_secret(&a_pub, &b_priv).unwrap();
            assert_eq!(ab, ba);
        }
    }

    #[test]
    fn agreement_is_deterministic() {
        let (a_priv, _) = pair();
        let (_, b_pub) = pair();
        assert_eq!(
            derive_shared_secret(&b_pub, &a_priv).unwrap(),
            derive_shared_secret(&b_pub, &a_priv).unwrap()
        );
    }

    #[test]
    fn raw_x_with_generator_is_public_x() {
        // k * G has the x-coordinate of k's own public key.
        let one = PrivateKey::from_hex(&format!("{}01", "00".repeat(31))).unwrap();
        let generator = one.public_key();
        let (b_priv, b_pub) = pair();
        let secret = derive_shared_secret(&generator, &b_priv).unwrap();
        assert_eq!(&secret.as_bytes()[..], &b_pub.to_compressed()[1..]);
    }

    #[test]
    fn sha256_mode_hashes_compressed_point() {
        let one = PrivateKey::from_hex(&format!("{}01", "00".repeat(31))).unwrap();
        let generator = one.public_key();
        let (b_priv, b_pub) = pair();
        let agreement = Secp256k1Agreement::new(SecretDerivation::Sha256Compressed);
        let secret = agreement.derive_shared_secret(&generator, &b_priv).unwrap();
        let expected = Sha256::digest(b_pub.to_compressed());
        assert_eq!(&secret.as_bytes()[..], expected.as_slice());
    }

    #[test]
    fn derivations_differ() {
        let (a_priv, _) = pair();
        let (_, b_pub) = pair();
        let raw = Secp256k1Agreement::new(SecretDerivation::RawX)
            .derive_shared_secret(&b_pub, &a_priv)
            .unwrap();
        let hashed = Secp256k1Agreement::new(SecretDerivation::Sha256Compressed)
            .derive_shared_secret(&b_pub, &a_priv)
            .unwrap();
        assert_ne!(raw, hashed);
    }

    #[test]
    fn ephemeral_secret_matches_receiver_side() {
        let agreement = Secp256k1Agreement::default();
        let (b_priv, b_pub) = pair();
        let (epk, sender_secret) = agreement.derive_ephemeral(&b_pub).unwrap();
        let receiver_secret = agreement.derive_shared_secret(&epk, &b_priv).unwrap();
        assert_eq!(sender_secret, receiver_secret);
    }

    #[test]
    fn ephemeral_keys_are_fresh() {
        let agreement = Secp256k1Agreement::default();
        let (_, b_pub) = pair();
        let (epk1, s1) = agreement.derive_ephemeral(&b_pub).unwrap();
        let (epk2, s2) = agreement.derive_ephemeral(&b_pub).unwrap();
        assert_ne!(epk1, epk2);
        assert_ne!(s1, s2);
    }

    #[test]
    fn derivation_deserialises_from_kebab_case() {
        let d: SecretDerivation = serde_json::from_str("\"sha256-compressed\"").unwrap();
        assert_eq!(d, SecretDerivation::Sha256Compressed);
        let d: SecretDerivation = serde_json::from_str("\"raw-x\"").unwrap();
        assert_eq!(d, SecretDerivation::RawX);
    }
}
