//! JSON envelope encoding and decoding.
//!
//! # Wire format
//!
//! ```text
//! {
//!   "protected":  base64url(JSON header),
//!   "iv":         base64url(12-byte nonce),
//!   "ciphertext": base64url(encrypted payload, tag NOT included),
//!   "tag":        base64url(16-byte GCM tag)
//! }
//! ```
//!
//! Ciphertext and tag are kept strictly separate on the wire. The `tag` field
//! is always the genuine AEAD tag split off the cipher output. Earlier senders
//! filled it from the first 16 bytes of the shared key, which published key
//! material; [`build`] takes no key at all so that cannot recur.

use common::{
    protocol::{Envelope, ProtectedHeader},
    EnvelopeError,
};

use crate::base64url;
use crate::crypto::{Sealed, NONCE_LEN, TAG_LEN};

/// A parsed envelope with every binary field decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEnvelope {
    /// The decoded protected header.
    pub header: ProtectedHeader,
    /// The `protected` field exactly as received; the AAD when the header is bound.
    pub protected: String,
    pub nonce: [u8; NONCE_LEN],
    /// Encrypted payload without the tag.
    pub ciphertext: Vec<u8>,
    pub tag: [u8; TAG_LEN],
}

impl ParsedEnvelope {
    /// `ciphertext || tag`, the layout the AEAD cipher expects.
    pub fn combined(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.ciphertext.len() + TAG_LEN);
        out.extend_from_slice(&self.ciphertext);
        out.extend_from_slice(&self.tag);
        out
    }
}

/// base64url of the JSON-serialised header.
pub fn encode_header(header: &ProtectedHeader) -> Result<String, EnvelopeError> {
    let json = serde_json::to_vec(header)
        .map_err(|e| EnvelopeError::MalformedEnvelope(format!("header serialisation: {e}")))?;
    Ok(base64url::encode(json))
}

/// Build an envelope around `sealed` with the fixed protected header.
pub fn build(sealed: &Sealed) -> Result<String, EnvelopeError> {
    build_with_header(&encode_header(&ProtectedHeader::fixed())?, sealed)
}

/// Build an envelope around `sealed` with an already-encoded `protected` value.
///
/// # Errors
///
/// Returns [`EnvelopeError::EncryptionFailure`] if `sealed` is shorter than a tag.
pub fn build_with_header(protected: &str, sealed: &Sealed) -> Result<String, EnvelopeError> {
    let (body, tag) = sealed.split_tag()?;
    let envelope = Envelope {
        protected: protected.to_owned(),
        iv: base64url::encode(sealed.nonce),
        ciphertext: base64url::encode(body),
        tag: base64url::encode(tag),
    };
    serde_json::to_string_pretty(&envelope)
        .map_err(|e| EnvelopeError::MalformedEnvelope(format!("envelope serialisation: {e}")))
}

/// Parse and decode an envelope.
///
/// # Errors
///
/// Returns [`EnvelopeError::MalformedEnvelope`] if the JSON is invalid, a
/// required field is missing or not base64url, the nonce or tag has the wrong
/// length, or the header does not describe the supported cryptosuite.
pub fn parse(json: &str) -> Result<ParsedEnvelope, EnvelopeError> {
    let envelope: Envelope = serde_json::from_str(json)
        .map_err(|e| EnvelopeError::MalformedEnvelope(e.to_string()))?;
    from_envelope(envelope)
}

/// Decode an already-deserialised [`Envelope`].
pub fn from_envelope(envelope: Envelope) -> Result<ParsedEnvelope, EnvelopeError> {
    let header_bytes = decode_field("protected", &envelope.protected)?;
    let header: ProtectedHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| EnvelopeError::MalformedEnvelope(format!("protected header: {e}")))?;
    if !header.is_supported_suite() {
        return Err(EnvelopeError::MalformedEnvelope(format!(
            "unsupported cryptosuite {}/{}/{}",
            header.alg, header.enc, header.crv
        )));
    }

    let nonce = decode_fixed::<NONCE_LEN>("iv", &envelope.iv)?;
    let ciphertext = decode_field("ciphertext", &envelope.ciphertext)?;
    let tag = decode_fixed::<TAG_LEN>("tag", &envelope.tag)?;

    Ok(ParsedEnvelope {
        header,
        protected: envelope.protected,
        nonce,
        ciphertext,
        tag,
    })
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>, EnvelopeError> {
    base64url::decode(value)
        .map_err(|e| EnvelopeError::MalformedEnvelope(format!("field `{name}`: {e}")))
}

fn decode_fixed<const N: usize>(name: &str, value: &str) -> Result<[u8; N], EnvelopeError> {
    let bytes = decode_field(name, value)?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        EnvelopeError::MalformedEnvelope(format!(
            "field `{name}` must be {N} bytes, got {}",
            b.len()
        ))
    })
}
