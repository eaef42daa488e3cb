//! Configuration loading and validation for the courier driver.
//!
//! All values are read from `COURIER_*` environment variables at startup and
//! then passed explicitly to the pipeline and registry client.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use envelope::{PipelineConfig, PrivateKey, SecretDerivation};
use serde::Deserialize;

/// Validated courier configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Hex private key of this party, optionally `0x`-prefixed. Required by
    /// `encrypt` and `decrypt`.
    #[serde(default)]
    pub private_key: Option<String>,

    /// Base URL of the DID registry; lookups hit `{registry_url}/dids/{did}`.
    #[serde(default = "default_registry_url")]
    pub registry_url: String,

    /// Per-request timeout for registry lookups.
    #[serde(default = "default_registry_timeout")]
    pub registry_timeout_secs: u64,

    /// Retries after the first failed registry attempt.
    #[serde(default = "default_registry_max_retries")]
    pub registry_max_retries: u32,

    /// Initial retry backoff; doubles after every attempt.
    #[serde(default = "default_registry_backoff")]
    pub registry_backoff_ms: u64,

    /// `raw-x` or `sha256-compressed`.
    #[serde(default)]
    pub derivation: SecretDerivation,

    #[serde(default)]
    pub ephemeral_keys: bool,

    #[serde(default)]
    pub bind_header: bool,

    #[serde(default)]
    pub accept_combined_ciphertext: bool,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_registry_url() -> String {
    "https://api-dev.ndakey.vn/sdk/api/v1".into()
}
fn default_registry_timeout() -> u64 {
    10
}
fn default_registry_max_retries() -> u32 {
    3
}
fn default_registry_backoff() -> u64 {
    250
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from `COURIER_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix("COURIER"))
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        let url = self.registry_url.trim();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            anyhow::bail!("COURIER_REGISTRY_URL must be an http(s) URL");
        }
        if self.registry_timeout_secs == 0 {
            anyhow::bail!("COURIER_REGISTRY_TIMEOUT_SECS must be > 0");
        }
        if let Some(key) = &self.private_key {
            PrivateKey::from_hex(key).context("COURIER_PRIVATE_KEY is not a valid secp256k1 key")?;
        }
        Ok(())
    }

    /// This party's private key.
    ///
    /// # Errors
    ///
    /// Returns an error if `COURIER_PRIVATE_KEY` is unset or invalid.
    pub fn local_key(&self) -> Result<PrivateKey> {
        let hex = self
            .private_key
            .as_deref()
            .context("COURIER_PRIVATE_KEY is required for this command")?;
        PrivateKey::from_hex(hex).context("COURIER_PRIVATE_KEY is not a valid secp256k1 key")
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            derivation: self.derivation,
            ephemeral_keys: self.ephemeral_keys,
            bind_header: self.bind_header,
            accept_combined_ciphertext: self.accept_combined_ciphertext,
        }
    }

    pub fn registry_timeout(&self) -> Duration {
        Duration::from_secs(self.registry_timeout_secs)
    }

    pub fn registry_backoff(&self) -> Duration {
        Duration::from_millis(self.registry_backoff_ms)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("private_key", &self.private_key.as_ref().map(|_| "[REDACTED]"))
            .field("registry_url", &self.registry_url)
            .field("registry_timeout_secs", &self.registry_timeout_secs)
            .field("registry_max_retries", &self.registry_max_retries)
            .field("registry_backoff_ms", &self.registry_backoff_ms)
            .field("derivation", &self.derivation)
            .field("ephemeral_keys", &self.ephemeral_keys)
            .field("bind_header", &self.bind_header)
            .field("accept_combined_ciphertext", &self.accept_combined_ciphertext)
            .field("log_level", &self.log_level)
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        private_key: Some(
            "0x0fc5abedcb46e4b63d2febc13cb308f0bbdcff7bc27e9621d18977cc6fa1713d".into(),
        ),
        registry_url: default_registry_url(),
        registry_timeout_secs: default_registry_timeout(),
        registry_max_retries: default_registry_max_retries(),
        registry_backoff_ms: default_registry_backoff(),
        derivation: SecretDerivation::default(),
        ephemeral_keys: false,
        bind_header: false,
        accept_combined_ciphertext: false,
        log_level: default_log_level(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_registry_url(), "https://api-dev.ndakey.vn/sdk/api/v1");
        assert_eq!(default_registry_timeout(), 10);
        assert_eq!(default_registry_max_retries(), 3);
        assert_eq!(default_registry_backoff(), 250);
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn validate_accepts_valid_config() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_non_http_registry() {
        let cfg = Config {
            registry_url: "ftp://registry".into(),
            ..test_config()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let cfg = Config {
            registry_timeout_secs: 0,
            ..test_config()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_private_key() {
        let cfg = Config {
            private_key: Some("0x1234".into()),
            ..test_config()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn local_key_requires_private_key() {
        let cfg = Config {
            private_key: None,
            ..test_config()
        };
        assert!(cfg.validate().is_ok());
        assert!(cfg.local_key().is_err());
    }

    #[test]
    fn pipeline_config_mirrors_flags() {
        let cfg = Config {
            derivation: SecretDerivation::Sha256Compressed,
            bind_header: true,
            ..test_config()
        };
        let p = cfg.pipeline_config();
        assert_eq!(p.derivation, SecretDerivation::Sha256Compressed);
        assert!(p.bind_header);
        assert!(!p.ephemeral_keys);
    }

    #[test]
    fn debug_redacts_private_key() {
        let rendered = format!("{:?}", test_config());
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains("0fc5abed"));
    }
}
