//! [`HttpRegistry`]: HTTPS client for `GET {base}/dids/{did}`.

use std::time::Duration;

use async_trait::async_trait;
use common::protocol::PeerKeyResponse;
use envelope::PublicKey;
use tracing::{debug, warn};

use super::{PublicKeyResolver, RegistryError};
use crate::config::Config;

/// DID registry client with per-request timeout and exponential backoff.
#[derive(Clone, Debug)]
pub struct HttpRegistry {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    backoff: Duration,
}

impl HttpRegistry {
    /// Build a client from explicit settings.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Transport`] if the TLS backend cannot be initialised.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        max_retries: u32,
        backoff: Duration,
    ) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            max_retries,
            backoff,
        })
    }

    /// Build a client from the `COURIER_REGISTRY_*` settings.
    pub fn from_config(cfg: &Config) -> Result<Self, RegistryError> {
        Self::new(
            cfg.registry_url.clone(),
            cfg.registry_timeout(),
            cfg.registry_max_retries,
            cfg.registry_backoff(),
        )
    }

    fn did_url(&self, did: &str) -> String {
        format!("{}/dids/{did}", self.base_url)
    }

    async fn fetch_once(&self, did: &str) -> Result<PublicKey, RegistryError> {
        let resp = self.client.get(self.did_url(did)).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RegistryError::Status {
                did: did.to_owned(),
                status: status.as_u16(),
            });
        }
        let body: PeerKeyResponse = resp.json().await?;
        PublicKey::from_hex(&body.data.public_key).map_err(|source| RegistryError::InvalidKey {
            did: did.to_owned(),
            source,
        })
    }
}

#[async_trait]
impl PublicKeyResolver for HttpRegistry {
    async fn resolve(&self, did: &str) -> Result<PublicKey, RegistryError> {
        let mut delay = self.backoff;
        let mut attempt = 0u32;
        loop {
            match self.fetch_once(did).await {
                Ok(key) => {
                    debug!(did, attempt, "peer key resolved");
                    return Ok(key);
                }
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    warn!(did, attempt, error = %e, "registry lookup failed; retrying");
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
