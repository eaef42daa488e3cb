//! Send and receive entry points composing key agreement, AEAD and the codec.
//!
//! All behaviour switches live in an explicit [`PipelineConfig`] value passed
//! at construction. Nothing is read from the process environment here.

use common::{
    error::StageExt, protocol::ProtectedHeader, EnvelopeError, PipelineError, Stage,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::codec::{self, ParsedEnvelope};
use crate::crypto::{cipher, KeyAgreement, Secp256k1Agreement, SecretDerivation, TAG_LEN};
use crate::keys::{PrivateKey, PublicKey, SharedSecret};

/// Pipeline options. Sender and receiver must agree on every field except
/// `accept_combined_ciphertext`, which only affects receiving.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// How the ECDH shared point becomes the AES key.
    pub derivation: SecretDerivation,

    /// Seal with a fresh ephemeral key pair per message and carry its public
    /// key in the header as `epk`. When off, envelopes carrying `epk` are
    /// rejected.
    pub ephemeral_keys: bool,

    /// Authenticate the `protected` field as AEAD additional data.
    pub bind_header: bool,

    /// Also accept envelopes whose `ciphertext` field holds
    /// `ciphertext || tag` and whose `tag` field is not a real tag, as
    /// produced by older senders. Never used when sealing.
    pub accept_combined_ciphertext: bool,
}

/// Seals plaintext into envelope JSON and opens it again.
///
/// Stateless apart from its configuration; share it freely across threads.
#[derive(Debug, Clone)]
pub struct Pipeline<A = Secp256k1Agreement> {
    agreement: A,
    config: PipelineConfig,
}

impl Pipeline<Secp256k1Agreement> {
    /// A pipeline using the `k256` backend with `config.derivation`.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            agreement: Secp256k1Agreement::new(config.derivation),
            config,
        }
    }
}

impl Default for Pipeline<Secp256k1Agreement> {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl<A: KeyAgreement> Pipeline<A> {
    /// A pipeline using a caller-supplied key-agreement backend.
    pub fn with_agreement(agreement: A, config: PipelineConfig) -> Self {
        Self { agreement, config }
    }

    /// Encrypt `plaintext` for `recipient_public` and return envelope JSON.
    ///
    /// `sender_private` is ignored when ephemeral keys are enabled.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] naming the failed stage.
    #[instrument(
        skip_all,
        fields(plaintext_len = plaintext.len(), ephemeral = self.config.ephemeral_keys)
    )]
    pub fn seal(
        &self,
        plaintext: &[u8],
        recipient_public: &PublicKey,
        sender_private: &PrivateKey,
    ) -> Result<String, PipelineError> {
        let (header, secret) = if self.config.ephemeral_keys {
            let (epk, secret) = self
                .agreement
                .derive_ephemeral(recipient_public)
                .stage(Stage::DeriveKey)?;
            (ProtectedHeader::with_epk(epk.to_hex()), secret)
        } else {
            let secret = self
                .agreement
                .derive_shared_secret(recipient_public, sender_private)
                .stage(Stage::DeriveKey)?;
            (ProtectedHeader::fixed(), secret)
        };

        let protected = codec::encode_header(&header).stage(Stage::Build)?;
        let aad = self.aad(&protected);
        let sealed = cipher::encrypt_with_aad(secret.as_bytes(), plaintext, aad)
            .stage(Stage::Encrypt)?;
        let json = codec::build_with_header(&protected, &sealed).stage(Stage::Build)?;

        debug!(ciphertext_len = sealed.ciphertext.len(), "envelope sealed");
        Ok(json)
    }

    /// Parse envelope JSON from `sender_public` and decrypt it.
    ///
    /// Returns plaintext only if authentication succeeded.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] naming the failed stage.
    #[instrument(skip_all, fields(envelope_len = envelope_json.len()))]
    pub fn open(
        &self,
        envelope_json: &str,
        sender_public: &PublicKey,
        recipient_private: &PrivateKey,
    ) -> Result<Vec<u8>, PipelineError> {
        let parsed = codec::parse(envelope_json).stage(Stage::Parse)?;
        self.open_parsed(&parsed, sender_public, recipient_private)
    }

    /// Decrypt an already-parsed envelope.
    pub fn open_parsed(
        &self,
        parsed: &ParsedEnvelope,
        sender_public: &PublicKey,
        recipient_private: &PrivateKey,
    ) -> Result<Vec<u8>, PipelineError> {
        let secret = self.receive_secret(parsed, sender_public, recipient_private)?;
        let aad = self.aad(&parsed.protected);

        let key = secret.as_bytes();
        match cipher::decrypt_with_aad(key, &parsed.nonce, &parsed.combined(), aad) {
            Ok(plaintext) => {
                debug!(plaintext_len = plaintext.len(), "envelope opened");
                Ok(plaintext)
            }
            Err(EnvelopeError::AuthenticationFailure)
                if self.config.accept_combined_ciphertext && parsed.ciphertext.len() >= TAG_LEN =>
            {
                // Any failure of the combined layout still means the envelope
                // did not authenticate.
                let plaintext =
                    cipher::decrypt_with_aad(key, &parsed.nonce, &parsed.ciphertext, aad)
                        .map_err(|_| EnvelopeError::AuthenticationFailure)
                        .stage(Stage::Decrypt)?;
                debug!(
                    plaintext_len = plaintext.len(),
                    "envelope opened with combined ciphertext"
                );
                Ok(plaintext)
            }
            Err(e) => Err(PipelineError::new(Stage::Decrypt, e)),
        }
    }

    fn receive_secret(
        &self,
        parsed: &ParsedEnvelope,
        sender_public: &PublicKey,
        recipient_private: &PrivateKey,
    ) -> Result<SharedSecret, PipelineError> {
        let peer = match parsed.header.epk.as_deref() {
            None => *sender_public,
            Some(epk) if self.config.ephemeral_keys => PublicKey::from_hex(epk)
                .map_err(|e| EnvelopeError::MalformedEnvelope(format!("header `epk`: {e}")))
                .stage(Stage::Parse)?,
            Some(_) => {
                return Err(PipelineError::new(
                    Stage::Parse,
                    EnvelopeError::MalformedEnvelope(
                        "envelope carries an ephemeral key but ephemeral keys are disabled".into(),
                    ),
                ))
            }
        };
        self.agreement
            .derive_shared_secret(&peer, recipient_private)
            .stage(Stage::DeriveKey)
    }

    fn aad<'a>(&self, protected: &'a str) -> &'a [u8] {
        if self.config.bind_header {
            protected.as_bytes()
        } else {
            &[]
        }
    }
}
