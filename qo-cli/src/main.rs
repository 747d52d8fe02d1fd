// SPDX-License-Identifier: MIT
//
// Quantum Origin Key Client
// Copyright (c) 2025 Valer Bocan, PhD, CSSLP
// Email: valer.bocan@upt.ro
//
// Department of Computer and Information Technology
// Politehnica University of Timisoara

//! qo-keygen - retrieve key material from a Quantum Origin key-generation service
//!
//! Parameters given on the command line take precedence over the configuration file;
//! anything left empty is filled from it. Builds with the `decrypt` feature decrypt the
//! service response and write the key; builds without it only report that the request
//! succeeded.
//!
//! ```text
//! ┌──────────┐  resolve   ┌───────────┐  POST /keygen  ┌──────────┐  decrypt  ┌────────┐
//! │ CLI+YAML │ ─────────> │ Validator │ ─────────────> │ Service  │ ────────> │ Output │
//! └──────────┘            └───────────┘   (retries)    └──────────┘           └────────┘
//! ```

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use clap::Parser;
use qo_core::{
    config::KeygenConfig,
    connection::ConnectionOptions,
    dispatcher::Dispatcher,
    pipeline::PipelineOutcome,
    protocol::{KeyAlgorithm, KeyType, OutputFormat},
    retry::RetryPolicy,
    secret::SecretBytes,
    ErrorStage, KeygenCommand, KeygenParameters,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "qo-keygen")]
#[command(about = "Retrieve key material from a Quantum Origin keygen service", long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Service URL
    #[arg(short, long)]
    url: Option<String>,

    /// Client certificate (PEM)
    #[arg(long)]
    cert: Option<String>,

    /// Private key for the client certificate (PEM)
    #[arg(long = "key")]
    private_key: Option<String>,

    /// API key
    #[arg(long)]
    api_key: Option<String>,

    /// Client ID (selects client-id authentication)
    #[arg(long)]
    client_id: Option<String>,

    /// Key type, e.g. RSA-2048 (overrides --key-algorithm)
    #[arg(short = 't', long)]
    key_type: Option<KeyType>,

    /// Key algorithm, e.g. EC (requires --key-parameters)
    #[arg(short = 'a', long)]
    key_algorithm: Option<KeyAlgorithm>,

    /// Key algorithm parameters as JSON
    #[arg(short = 'p', long)]
    key_parameters: Option<String>,

    /// Nonce (base64); generated when absent
    #[arg(long)]
    nonce: Option<String>,

    /// Shared secret (base64)
    #[arg(long)]
    shared_secret: Option<String>,

    /// Output format (binary, hex, base64)
    #[arg(short = 'f', long)]
    output_format: Option<OutputFormat>,

    /// Output file; standard output when absent or "-"
    #[arg(short, long)]
    output: Option<String>,

    /// Maximum request attempts
    #[arg(long, default_value_t = 5)]
    max_retries: u32,

    /// Per-attempt timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    /// Invocation parameters; anything not given stays empty for the resolver
    fn to_parameters(&self) -> Result<KeygenParameters> {
        let mut params = KeygenParameters::default();
        params.api.url = self.url.clone().unwrap_or_default();
        params.api.auth.client_certificate_filename = self.cert.clone().unwrap_or_default();
        params.api.auth.private_key_filename = self.private_key.clone().unwrap_or_default();
        params.api.auth.api_key = self.api_key.clone().unwrap_or_default();
        params.api.auth.client_id = self.client_id.clone().unwrap_or_default();
        params.key_type = self.key_type;
        params.key_algorithm = self.key_algorithm;
        params.key_parameters.json = self.key_parameters.clone().unwrap_or_default();
        params.decryption.nonce = decode_base64_arg("--nonce", self.nonce.as_deref())?;
        params.decryption.shared_secret =
            decode_base64_arg("--shared-secret", self.shared_secret.as_deref())?;
        params.output.format = self.output_format;
        params.output.filename = self.output.clone().unwrap_or_default();
        Ok(params)
    }
}

fn decode_base64_arg(flag: &str, value: Option<&str>) -> Result<SecretBytes> {
    match value {
        None | Some("") => Ok(SecretBytes::empty()),
        Some(encoded) => STANDARD
            .decode(encoded.trim())
            .map(SecretBytes::new)
            .with_context(|| format!("{} is not valid base64", flag)),
    }
}

#[cfg(feature = "decrypt")]
fn pipeline() -> qo_core::pipeline::DecryptingPipeline<qo_core::crypto::AesGcmDecryptor> {
    qo_core::pipeline::DecryptingPipeline::new(qo_core::crypto::AesGcmDecryptor)
}

#[cfg(not(feature = "decrypt"))]
fn pipeline() -> qo_core::pipeline::PassthroughPipeline {
    qo_core::pipeline::PassthroughPipeline
}

fn hint(stage: ErrorStage) -> &'static str {
    match stage {
        ErrorStage::Configuration => "check the command line and configuration file",
        ErrorStage::Transport => "the keygen service could not be used, try again later",
        ErrorStage::Decryption => "check that the shared secret matches the provisioned one",
        ErrorStage::Output => "key material could not be written",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    // Initialize tracing on stderr so key material on stdout stays clean
    let log_level = args
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr);
    if args.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(
        "qo-keygen v{} (decryption support: {})",
        env!("CARGO_PKG_VERSION"),
        qo_core::DECRYPT_SUPPORT
    );

    let config = args
        .config
        .as_ref()
        .map(KeygenConfig::load)
        .transpose()
        .context("Failed to load configuration")?;
    let params = args.to_parameters()?;

    let command = KeygenCommand::new(pipeline())
        .with_dispatcher(Dispatcher::new(RetryPolicy::with_max_attempts(args.max_retries)))
        .with_connection_options(ConnectionOptions {
            timeout: Duration::from_secs(args.timeout_secs),
            ..Default::default()
        });

    match command.run(params, config.as_ref()).await {
        Ok(PipelineOutcome::Emitted { bytes }) => {
            info!("Retrieved {} bytes of key material", bytes);
            Ok(())
        }
        Ok(PipelineOutcome::Withheld) => {
            info!("Key request succeeded; response left encrypted");
            Ok(())
        }
        Err(e) => {
            let stage = e.stage();
            error!("keygen failed during {:?} stage: {}", stage, e);
            Err(anyhow::Error::new(e).context(hint(stage)))
        }
    }
}
