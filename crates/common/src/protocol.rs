//! Wire types exchanged between parties and with the DID registry.
//!
//! These types are serialised as JSON. Binary envelope fields are carried as
//! unpadded base64url strings; decoding them is the envelope codec's job.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Key-agreement algorithm named in every protected header.
pub const ALG_ECDH_ES: &str = "ECDH-ES";
/// Content-encryption algorithm named in every protected header.
pub const ENC_A256GCM: &str = "A256GCM";
/// Curve named in every protected header.
pub const CRV_SECP256K1: &str = "secp256k1";
/// Media type named in every protected header.
pub const TYP_DIDCOMM_ENCRYPTED: &str = "application/didcomm-encrypted+json";

/// JWE-like envelope as it appears on the wire.
///
/// Field order matches the serialised order: `protected`, `iv`, `ciphertext`, `tag`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// base64url of the JSON-encoded [`ProtectedHeader`].
    pub protected: String,
    /// base64url of the 12-byte nonce.
    pub iv: String,
    /// base64url of the encrypted payload, without the tag.
    pub ciphertext: String,
    /// base64url of the 16-byte AEAD authentication tag.
    pub tag: String,
}

/// Static cryptosuite metadata carried in [`Envelope::protected`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedHeader {
    pub alg: String,
    pub enc: String,
    pub crv: String,
    pub typ: String,
    /// Sender's ephemeral public key (compressed, hex). Only present when the
    /// ephemeral-key option is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epk: Option<String>,
}

impl ProtectedHeader {
    /// The fixed header: ECDH-ES / A256GCM / secp256k1.
    pub fn fixed() -> Self {
        Self {
            alg: ALG_ECDH_ES.into(),
            enc: ENC_A256GCM.into(),
            crv: CRV_SECP256K1.into(),
            typ: TYP_DIDCOMM_ENCRYPTED.into(),
            epk: None,
        }
    }

    /// The fixed header carrying an ephemeral public key.
    pub fn with_epk(epk_hex: impl Into<String>) -> Self {
        Self {
            epk: Some(epk_hex.into()),
            ..Self::fixed()
        }
    }

    /// Returns `true` if `alg`, `enc` and `crv` name the supported cryptosuite.
    pub fn is_supported_suite(&self) -> bool {
        self.alg == ALG_ECDH_ES && self.enc == ENC_A256GCM && self.crv == CRV_SECP256K1
    }
}

// ---------------------------------------------------------------------------
// DID registry
// ---------------------------------------------------------------------------

/// Response body of `GET {registry}/dids/{did}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerKeyResponse {
    pub data: PeerKeyData,
}

/// Payload of [`PeerKeyResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerKeyData {
    /// Hex-encoded public key, optionally `0x`-prefixed.
    #[serde(rename = "publicKey")]
    pub public_key: String,
}

// ---------------------------------------------------------------------------
// Webhook
// ---------------------------------------------------------------------------

/// Inbound webhook event carrying encrypted attachments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// DID of the sender; used to look up their public key.
    pub from: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub data: AttachmentData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentData {
    /// The envelope, embedded as a JSON object rather than a string.
    pub json: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fixed_header_serialises_without_epk() {
        let json = serde_json::to_value(ProtectedHeader::fixed()).unwrap();
        assert_eq!(
            json,
            json!({
                "alg": "ECDH-ES",
                "enc": "A256GCM",
                "crv": "secp256k1",
                "typ": "application/didcomm-encrypted+json"
            })
        );
    }

    #[test]
    fn header_with_epk_round_trip() {
        let h = ProtectedHeader::with_epk("02abcd");
        let s = serde_json::to_string(&h).unwrap();
        let decoded: ProtectedHeader = serde_json::from_str(&s).unwrap();
        assert_eq!(decoded.epk.as_deref(), Some("02abcd"));
        assert!(decoded.is_supported_suite());
    }

    #[test]
    fn unsupported_suite_detected() {
        let h = ProtectedHeader {
            enc: "A128GCM".into(),
            ..ProtectedHeader::fixed()
        };
        assert!(!h.is_supported_suite());
    }

    #[test]
    fn peer_key_response_uses_camel_case() {
        let resp: PeerKeyResponse =
            serde_json::from_value(json!({"data": {"publicKey": "0x02ab"}})).unwrap();
        assert_eq!(resp.data.public_key, "0x02ab");
    }

    #[test]
    fn webhook_event_parses_embedded_envelope() {
        let event: WebhookEvent = serde_json::from_value(json!({
            "from": "did:example:alice",
            "attachments": [{"data": {"json": {"iv": "AA"}}}]
        }))
        .unwrap();
        assert_eq!(event.from, "did:example:alice");
        assert_eq!(event.attachments[0].data.json["iv"], "AA");
    }
}
