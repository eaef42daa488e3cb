//! Peer public-key lookup from a DID registry.
//!
//! The envelope core only ever sees decoded [`PublicKey`]s. Everything about
//! getting them (transport, timeouts, retries) lives here and is configured
//! by the caller.
//!
//! Lookups are plain futures: dropping one cancels the in-flight request and
//! any pending retry.

pub mod http;

pub use http::HttpRegistry;

use async_trait::async_trait;
use common::EnvelopeError;
use envelope::PublicKey;
use thiserror::Error;

/// Errors produced by the registry layer.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The request could not be sent or the response body could not be read.
    #[error("registry transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The registry answered with a non-success status.
    #[error("registry returned HTTP {status} for {did}")]
    Status { did: String, status: u16 },

    /// The registry returned a key that is not a valid secp256k1 point.
    #[error("registry returned an invalid key for {did}: {source}")]
    InvalidKey {
        did: String,
        #[source]
        source: EnvelopeError,
    },
}

impl RegistryError {
    /// Whether another attempt might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            RegistryError::Transport(e) => !e.is_decode() && !e.is_builder(),
            RegistryError::Status { status, .. } => *status == 429 || *status >= 500,
            RegistryError::InvalidKey { .. } => false,
        }
    }
}

/// Resolves a DID to the public key used for key agreement.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PublicKeyResolver: Send + Sync {
    async fn resolve(&self, did: &str) -> Result<PublicKey, RegistryError>;
}
