//! `courier` — command-line driver for the envelope pipeline.
//!
//! Startup sequence:
//! 1. Parse command-line arguments.
//! 2. Load and validate [`Config`] from `COURIER_*` environment variables.
//! 3. Initialise structured JSON logging on stderr.
//! 4. Build the pipeline and registry client from the config.
//! 5. Run the selected command, writing its result to stdout.

mod commands;
mod config;
mod registry;
mod telemetry;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::protocol::WebhookEvent;
use envelope::{Pipeline, PrivateKey, PublicKey};
use tracing::info;

use commands::Peer;
use config::Config;
use registry::HttpRegistry;

#[derive(Debug, Parser)]
#[command(name = "courier", version, about = "Seal and open secp256k1/AES-256-GCM envelopes")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a fresh key pair.
    Keygen,

    /// Seal a message for a peer and print the envelope JSON.
    Encrypt {
        /// Message text to encrypt.
        #[arg(long)]
        message: String,

        /// DID of the recipient, resolved through the registry.
        #[arg(long, required_unless_present = "peer_key")]
        to: Option<String>,

        /// Recipient public key (hex); skips the registry.
        #[arg(long)]
        peer_key: Option<String>,
    },

    /// Open the first attachment of a webhook event file and print the plaintext.
    Decrypt {
        /// Path to the webhook event JSON.
        #[arg(long)]
        webhook: PathBuf,

        /// Sender public key (hex); skips resolving the event's `from` DID.
        #[arg(long)]
        peer_key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Arguments
    // -----------------------------------------------------------------------
    let cli = Cli::parse();

    // -----------------------------------------------------------------------
    // 2. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 3. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init(&cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        derivation = ?cfg.derivation,
        ephemeral_keys = cfg.ephemeral_keys,
        bind_header = cfg.bind_header,
        "courier starting"
    );

    // -----------------------------------------------------------------------
    // 4. Pipeline + registry
    // -----------------------------------------------------------------------
    let pipeline = Pipeline::new(cfg.pipeline_config());
    let registry = HttpRegistry::from_config(&cfg).context("failed to build registry client")?;

    // -----------------------------------------------------------------------
    // 5. Command
    // -----------------------------------------------------------------------
    match cli.command {
        Command::Keygen => {
            let key = PrivateKey::generate();
            println!("private_key: {}", key.to_hex().as_str());
            println!("public_key:  {}", key.public_key());
        }
        Command::Encrypt {
            message,
            to,
            peer_key,
        } => {
            let local = cfg.local_key()?;
            let peer = Peer::from_args(to, peer_key.as_deref())?;
            let envelope = commands::encrypt(&pipeline, &registry, &local, &peer, &message).await?;
            println!("{envelope}");
        }
        Command::Decrypt { webhook, peer_key } => {
            let local = cfg.local_key()?;
            let raw = tokio::fs::read_to_string(&webhook)
                .await
                .with_context(|| format!("failed to read {}", webhook.display()))?;
            let event: WebhookEvent =
                serde_json::from_str(&raw).context("webhook file is not a valid event")?;
            let peer_override = peer_key
                .as_deref()
                .map(PublicKey::from_hex)
                .transpose()
                .context("--peer-key is not a valid secp256k1 public key")?;
            let plaintext =
                commands::decrypt_webhook(&pipeline, &registry, &local, &event, peer_override)
                    .await?;
            println!("{plaintext}");
        }
    }

    Ok(())
}
