//! Common error types shared across crates.

use std::fmt;

use thiserror::Error;

/// Error taxonomy of the envelope pipeline.
///
/// Messages never carry key material or plaintext; the `String` payloads hold
/// a short description of what was wrong with the input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// A key has the wrong length, is not a valid scalar, or is not a curve point.
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// The cipher failed for a reason other than authentication.
    #[error("encryption failure: {0}")]
    EncryptionFailure(String),

    /// The AEAD tag did not verify: tampered data or the wrong key.
    #[error("authentication failure")]
    AuthenticationFailure,

    /// Any other cipher-level decrypt error, e.g. input shorter than the tag.
    #[error("decryption failure: {0}")]
    DecryptionFailure(String),

    /// Invalid JSON, a missing field, or a field with the wrong shape.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Base64url decode failure.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),
}

impl EnvelopeError {
    /// Short machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            EnvelopeError::InvalidKeyMaterial(_) => "invalid_key_material",
            EnvelopeError::EncryptionFailure(_) => "encryption_failure",
            EnvelopeError::AuthenticationFailure => "authentication_failure",
            EnvelopeError::DecryptionFailure(_) => "decryption_failure",
            EnvelopeError::MalformedEnvelope(_) => "malformed_envelope",
            EnvelopeError::InvalidEncoding(_) => "invalid_encoding",
        }
    }
}

/// Pipeline step in which an [`EnvelopeError`] was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    DeriveKey,
    Encrypt,
    Build,
    Parse,
    Decrypt,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::DeriveKey => "derive-key",
            Stage::Encrypt => "encrypt",
            Stage::Build => "build",
            Stage::Parse => "parse",
            Stage::Decrypt => "decrypt",
        })
    }
}

/// An [`EnvelopeError`] annotated with the pipeline step that failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{stage} failed: {source}")]
pub struct PipelineError {
    /// Which step failed.
    pub stage: Stage,
    /// The underlying typed error.
    #[source]
    pub source: EnvelopeError,
}

impl PipelineError {
    pub fn new(stage: Stage, source: EnvelopeError) -> Self {
        Self { stage, source }
    }

    /// Borrow the underlying error kind.
    pub fn kind(&self) -> &EnvelopeError {
        &self.source
    }
}

/// Extension for attaching a [`Stage`] to fallible results.
pub trait StageExt<T> {
    /// Wrap the error with the step it was raised in.
    fn stage(self, stage: Stage) -> Result<T, PipelineError>;
}

impl<T> StageExt<T> for Result<T, EnvelopeError> {
    fn stage(self, stage: Stage) -> Result<T, PipelineError> {
        self.map_err(|source| PipelineError::new(stage, source))
    }
}
