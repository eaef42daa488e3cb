//! Command implementations, independent of argument parsing and process setup.

use anyhow::{Context, Result};
use common::protocol::WebhookEvent;
use envelope::{Pipeline, PrivateKey, PublicKey};
use tracing::{info, warn};

use crate::registry::PublicKeyResolver;

/// How the peer of an `encrypt` or `decrypt` is identified.
#[derive(Debug, Clone)]
pub enum Peer {
    /// Look the key up in the DID registry.
    Did(String),
    /// Use this key directly.
    Key(PublicKey),
}

impl Peer {
    /// Build from CLI arguments: an explicit key wins over a DID.
    pub fn from_args(did: Option<String>, key_hex: Option<&str>) -> Result<Self> {
        match (key_hex, did) {
            (Some(hex), _) => Ok(Peer::Key(
                PublicKey::from_hex(hex).context("--peer-key is not a valid secp256k1 public key")?,
            )),
            (None, Some(did)) => Ok(Peer::Did(did)),
            (None, None) => anyhow::bail!("either a peer DID or --peer-key is required"),
        }
    }

    async fn resolve(&self, resolver: &dyn PublicKeyResolver) -> Result<PublicKey> {
        match self {
            Peer::Key(key) => Ok(*key),
            Peer::Did(did) => resolver
                .resolve(did)
                .await
                .with_context(|| format!("failed to resolve public key for {did}")),
        }
    }
}

/// Seal `message` for `peer` and return the envelope JSON.
pub async fn encrypt(
    pipeline: &Pipeline,
    resolver: &dyn PublicKeyResolver,
    local: &PrivateKey,
    peer: &Peer,
    message: &str,
) -> Result<String> {
    let peer_key = peer.resolve(resolver).await?;
    let envelope = pipeline
        .seal(message.as_bytes(), &peer_key, local)
        .inspect_err(|e| warn!(code = e.kind().code(), stage = %e.stage, "seal failed"))
        .context("encryption failed")?;
    info!(bytes = message.len(), "message sealed");
    Ok(envelope)
}

/// Open the first attachment of a webhook event and return it as UTF-8 text.
///
/// The sender key comes from `peer_override` when given, otherwise from
/// resolving `event.from`.
pub async fn decrypt_webhook(
    pipeline: &Pipeline,
    resolver: &dyn PublicKeyResolver,
    local: &PrivateKey,
    event: &WebhookEvent,
    peer_override: Option<PublicKey>,
) -> Result<String> {
    let attachment = event
        .attachments
        .first()
        .context("webhook event has no attachments")?;
    let envelope_json =
        serde_json::to_string(&attachment.data.json).context("attachment is not serialisable")?;

    let peer = match peer_override {
        Some(key) => Peer::Key(key),
        None => Peer::Did(event.from.clone()),
    };
    let sender_key = peer.resolve(resolver).await?;

    let plaintext = pipeline
        .open(&envelope_json, &sender_key, local)
        .inspect_err(|e| warn!(code = e.kind().code(), stage = %e.stage, "open failed"))
        .context("decryption failed")?;
    info!(from = %event.from, bytes = plaintext.len(), "message opened");
    String::from_utf8(plaintext).context("decrypted message is not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{MockPublicKeyResolver, RegistryError};
    use common::{EnvelopeError, PipelineError};
    use serde_json::json;

    fn event_for(from: &str, envelope_json: &str) -> WebhookEvent {
        let envelope: serde_json::Value = serde_json::from_str(envelope_json).unwrap();
        serde_json::from_value(json!({
            "from": from,
            "attachments": [{"data": {"json": envelope}}]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn encrypt_then_decrypt_via_registry() {
        let alice = PrivateKey::generate();
        let bob = PrivateKey::generate();
        let alice_pub = alice.public_key();
        let bob_pub = bob.public_key();
        let pipeline = Pipeline::default();

        let mut resolver = MockPublicKeyResolver::new();
        resolver
            .expect_resolve()
            .withf(|did| did == "did:example:bob")
            .times(1)
            .returning(move |_| Ok(bob_pub));
        resolver
            .expect_resolve()
            .withf(|did| did == "did:example:alice")
            .times(1)
            .returning(move |_| Ok(alice_pub));

        let envelope = encrypt(
            &pipeline,
            &resolver,
            &alice,
            &Peer::Did("did:example:bob".into()),
            "hello didcomm",
        )
        .await
        .unwrap();

        let event = event_for("did:example:alice", &envelope);
        let text = decrypt_webhook(&pipeline, &resolver, &bob, &event, None)
            .await
            .unwrap();
        assert_eq!(text, "hello didcomm");
    }

    #[tokio::test]
    async fn peer_override_skips_registry() {
        let alice = PrivateKey::generate();
        let bob = PrivateKey::generate();
        let pipeline = Pipeline::default();

        let mut resolver = MockPublicKeyResolver::new();
        resolver.expect_resolve().never();

        let envelope = encrypt(
            &pipeline,
            &resolver,
            &alice,
            &Peer::Key(bob.public_key()),
            "direct",
        )
        .await
        .unwrap();
        let event = event_for("did:example:alice", &envelope);
        let text = decrypt_webhook(&pipeline, &resolver, &bob, &event, Some(alice.public_key()))
            .await
            .unwrap();
        assert_eq!(text, "direct");
    }

    #[tokio::test]
    async fn registry_failure_aborts_decrypt() {
        let bob = PrivateKey::generate();
        let envelope = Pipeline::default()
            .seal(b"x", &bob.public_key(), &PrivateKey::generate())
            .unwrap();

        let mut resolver = MockPublicKeyResolver::new();
        resolver.expect_resolve().returning(|did| {
            Err(RegistryError::Status {
                did: did.to_owned(),
                status: 404,
            })
        });

        let event = event_for("did:example:ghost", &envelope);
        let err = decrypt_webhook(&Pipeline::default(), &resolver, &bob, &event, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("did:example:ghost"));
    }

    #[tokio::test]
    async fn wrong_sender_key_is_authentication_failure() {
        let alice = PrivateKey::generate();
        let bob = PrivateKey::generate();
        let envelope = Pipeline::default()
            .seal(b"x", &bob.public_key(), &alice)
            .unwrap();

        let resolver = MockPublicKeyResolver::new();
        let event = event_for("did:example:alice", &envelope);
        let impostor = PrivateKey::generate().public_key();
        let err = decrypt_webhook(&Pipeline::default(), &resolver, &bob, &event, Some(impostor))
            .await
            .unwrap_err();
        let pipeline_err = err.downcast_ref::<PipelineError>().expect("pipeline error");
        assert_eq!(pipeline_err.kind(), &EnvelopeError::AuthenticationFailure);
        assert_eq!(pipeline_err.kind().code(), "authentication_failure");
    }

    #[tokio::test]
    async fn event_without_attachments_is_rejected() {
        let resolver = MockPublicKeyResolver::new();
        let event: WebhookEvent =
            serde_json::from_value(json!({"from": "did:example:a", "attachments": []})).unwrap();
        let err = decrypt_webhook(
            &Pipeline::default(),
            &resolver,
            &PrivateKey::generate(),
            &event,
            None,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("no attachments"));
    }

    #[test]
    fn peer_from_args() {
        let key = PrivateKey::generate().public_key();
        let hex = key.to_hex();
        assert!(matches!(
            Peer::from_args(Some("did:x".into()), Some(&hex)).unwrap(),
            Peer::Key(k) if k == key
        ));
        assert!(matches!(
            Peer::from_args(Some("did:x".into()), None).unwrap(),
            Peer::Did(d) if d == "did:x"
        ));
        assert!(Peer::from_args(None, None).is_err());
        assert!(Peer::from_args(None, Some("nothex")).is_err());
    }
}
