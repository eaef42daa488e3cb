//! Cryptographic primitives: secp256k1 key agreement and AES-256-GCM.
//!
//! This module is free of JSON and I/O. It provides the low-level operations
//! the pipeline composes.

pub mod agreement;
pub mod cipher;

pub use agreement::{derive_shared_secret, KeyAgreement, Secp256k1Agreement, SecretDerivation};
pub use cipher::{Sealed, KEY_LEN, NONCE_LEN, TAG_LEN};
