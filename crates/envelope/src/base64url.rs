//! Unpadded base64url for binary fields embedded in JSON.
//!
//! Encoding never emits `=`. Decoding accepts input with or without padding,
//! so envelopes produced by encoders that keep the padding still parse.
//! Non-zero bits left over in the final symbol are ignored rather than
//! rejected, so `Zh` decodes the same as the canonical `Zg`.

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use common::EnvelopeError;

const ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Encode bytes as unpadded base64url.
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    ENGINE.encode(bytes)
}

/// Decode a base64url string.
///
/// # Errors
///
/// Returns [`EnvelopeError::InvalidEncoding`] on characters outside the
/// base64url alphabet or an impossible input length.
pub fn decode(input: &str) -> Result<Vec<u8>, EnvelopeError> {
    ENGINE
        .decode(input)
        .map_err(|e| EnvelopeError::InvalidEncoding(e.to_string()))
}
