// SPDX-License-Identifier: MIT

use crate::sdk::error::ProbeError;
use crate::sdk::provider::{ProviderParameters, ProviderType};
use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// What a probe saw. `None` means the probed item does not exist.
pub type Observation = Option<Value>;

/// One probe invocation
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    /// Rule the observation is for
    pub rule_name: String,
    /// Resolved parameters; the variant always matches the rule's provider
    pub parameters: ProviderParameters,
    /// Fired when the rule's timeout elapses. Long-running probes should
    /// watch it and return `ProbeError::Cancelled`.
    pub cancellation: CancellationToken,
}

impl ProbeRequest {
    pub fn provider(&self) -> ProviderType {
        self.parameters.provider()
    }
}

/// Capability that observes one OS subsystem.
///
/// The engine calls `observe` exactly once per rule per run. Implementations
/// are shared across concurrently running rules.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Returns the probe name, used in logs
    fn name(&self) -> &str;

    /// Observe the value the request's parameters point at
    async fn observe(&self, request: ProbeRequest) -> Result<Observation, ProbeError>;
}
