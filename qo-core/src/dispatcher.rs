//! Retrying request dispatch
//!
//! The dispatcher owns the retry policy. From the caller's point of view one call is
//! atomic: it yields one response or one terminal error.

use crate::connection::Transport;
use crate::protocol::{KeyRequest, KeyResponse};
use crate::retry::RetryPolicy;
use crate::Result;
use tracing::{info, instrument};

#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    policy: RetryPolicy,
}

impl Dispatcher {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send `request`, retrying transient failures until the policy is exhausted
    #[instrument(skip_all, fields(request = %request.describe(), max_attempts = self.policy.max_attempts))]
    pub async fn send<T: Transport>(&self, transport: &T, request: &KeyRequest) -> Result<KeyResponse> {
        let response = self.policy.execute(|| transport.send(request)).await?;
        info!("Key response received");
        Ok(response)
    }
}
