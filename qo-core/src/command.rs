//! The keygen command
//!
//! ```text
//! params + config ──resolve──> validate ──> KeyRequest ──Dispatcher──> KeyPipeline ──> sink
//! ```
//!
//! [`KeygenCommand::prepare`] covers everything up to request construction and has no
//! side effects beyond nonce generation and logging. [`KeygenCommand::execute`] talks
//! to the service through any [`Transport`]; [`KeygenCommand::run`] uses a real
//! [`Connection`] and writes to the destination named by the resolved parameters.

use crate::config::KeygenConfig;
use crate::connection::{Connection, ConnectionOptions, Transport};
use crate::dispatcher::Dispatcher;
use crate::output::{OutputDestination, OutputSink};
use crate::params::KeygenParameters;
use crate::pipeline::{KeyPipeline, PipelineOutcome};
use crate::protocol::KeyRequest;
use crate::{resolver, validator, Result};
use tracing::info;

/// Validated parameters together with the request built from them
#[derive(Debug, Clone)]
pub struct PreparedKeygen {
    params: KeygenParameters,
    request: KeyRequest,
}

impl PreparedKeygen {
    pub fn params(&self) -> &KeygenParameters {
        &self.params
    }

    pub fn request(&self) -> &KeyRequest {
        &self.request
    }

    /// Where key material goes, after configuration has filled the output fields
    pub fn destination(&self) -> OutputDestination {
        OutputDestination::from_parameters(&self.params.output)
    }
}

pub struct KeygenCommand<P> {
    pipeline: P,
    dispatcher: Dispatcher,
    connection_options: ConnectionOptions,
}

impl<P: KeyPipeline> KeygenCommand<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            dispatcher: Dispatcher::default(),
            connection_options: ConnectionOptions::default(),
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn with_connection_options(mut self, options: ConnectionOptions) -> Self {
        self.connection_options = options;
        self
    }

    /// Resolve against `config`, validate for this pipeline and build the request
    pub fn prepare(
        &self,
        mut params: KeygenParameters,
        config: Option<&KeygenConfig>,
    ) -> Result<PreparedKeygen> {
        resolver::resolve(&mut params, config);
        validator::validate(&mut params, self.pipeline.policy())?;
        params.log_summary();

        let request = KeyRequest::from_parameters(&params)?;
        Ok(PreparedKeygen { params, request })
    }

    /// Dispatch a prepared request and hand the response to the pipeline
    pub async fn execute<T: Transport>(
        &self,
        prepared: &PreparedKeygen,
        transport: &T,
        sink: &mut dyn OutputSink,
    ) -> Result<PipelineOutcome> {
        info!("Working on [keygen]");
        let response = self.dispatcher.send(transport, &prepared.request).await?;
        self.pipeline.handle(&response, &prepared.params, sink)
    }

    /// Full invocation against the configured service
    pub async fn run(
        &self,
        params: KeygenParameters,
        config: Option<&KeygenConfig>,
    ) -> Result<PipelineOutcome> {
        let prepared = self.prepare(params, config)?;
        let mut destination = prepared.destination();
        let connection =
            Connection::from_api_parameters(&prepared.params.api, &self.connection_options)?;
        self.execute(&prepared, &connection, &mut destination).await
    }
}
