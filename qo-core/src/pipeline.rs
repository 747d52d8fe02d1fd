//! Response handling variants
//!
//! The binary picks one variant when it is composed:
//!
//! - [`DecryptingPipeline`] needs a shared secret, decrypts the response and emits the
//!   plaintext key material.
//! - [`PassthroughPipeline`] has no decryption capability. The encrypted payload is
//!   only visible in trace logs and nothing is emitted.

use crate::crypto::Decryptor;
use crate::output::OutputSink;
use crate::params::KeygenParameters;
use crate::protocol::KeyResponse;
use crate::validator::ValidationPolicy;
use crate::Result;
use tracing::{debug, info, trace, warn};

/// What a pipeline did with a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Plaintext key material of this length was emitted
    Emitted { bytes: usize },
    /// The response stayed encrypted and nothing was emitted
    Withheld,
}

pub trait KeyPipeline {
    /// Preconditions this variant adds to validation
    fn policy(&self) -> ValidationPolicy;

    fn handle(
        &self,
        response: &KeyResponse,
        params: &KeygenParameters,
        sink: &mut dyn OutputSink,
    ) -> Result<PipelineOutcome>;
}

/// Full pipeline: decrypt then emit
#[derive(Debug, Clone, Default)]
pub struct DecryptingPipeline<D> {
    decryptor: D,
}

impl<D: Decryptor> DecryptingPipeline<D> {
    pub fn new(decryptor: D) -> Self {
        Self { decryptor }
    }
}

impl<D: Decryptor> KeyPipeline for DecryptingPipeline<D> {
    fn policy(&self) -> ValidationPolicy {
        ValidationPolicy::DECRYPTING
    }

    fn handle(
        &self,
        response: &KeyResponse,
        params: &KeygenParameters,
        sink: &mut dyn OutputSink,
    ) -> Result<PipelineOutcome> {
        info!("Working on [keydecrypt]");
        debug!("Encoded payload len = {}", response.encrypted.encrypted_data.len());

        let material = self.decryptor.decrypt(
            &params.decryption.shared_secret,
            &params.decryption.nonce,
            response,
        )?;
        sink.emit(params.output.format_or_default(), &material)?;

        Ok(PipelineOutcome::Emitted {
            bytes: material.len(),
        })
    }
}

/// Encrypted passthrough for builds without decryption support
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughPipeline;

impl KeyPipeline for PassthroughPipeline {
    fn policy(&self) -> ValidationPolicy {
        ValidationPolicy::PASSTHROUGH
    }

    fn handle(
        &self,
        response: &KeyResponse,
        _params: &KeygenParameters,
        _sink: &mut dyn OutputSink,
    ) -> Result<PipelineOutcome> {
        warn!("Decryption support is not built in, no key material will be written");
        trace!(
            "Encrypted response: {}",
            hex::encode(&response.encrypted.encrypted_data)
        );
        Ok(PipelineOutcome::Withheld)
    }
}
