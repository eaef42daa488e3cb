//! secp256k1 ECDH + AES-256-GCM message envelopes.
//!
//! # Send
//!
//! key agreement → shared key → AES-256-GCM encrypt → JSON envelope
//!
//! # Receive
//!
//! parse envelope → base64url-decode fields → key agreement → AES-256-GCM decrypt
//!
//! ```ignore
//! let pipeline = Pipeline::new(PipelineConfig::default());
//! let json = pipeline.seal(b"hello didcomm", &bob_public, &alice_private)?;
//! let plaintext = pipeline.open(&json, &alice_public, &bob_private)?;
//! ```
//!
//! Every component is stateless. The OS CSPRNG used for nonces and ephemeral
//! keys is the only shared resource.

pub mod base64url;
pub mod codec;
pub mod crypto;
pub mod keys;
pub mod pipeline;

pub use codec::ParsedEnvelope;
pub use common::{protocol::Envelope, EnvelopeError, PipelineError, Stage};
pub use crypto::{KeyAgreement, Secp256k1Agreement, SecretDerivation};
pub use keys::{PrivateKey, PublicKey, SharedSecret};
pub use pipeline::{Pipeline, PipelineConfig};
