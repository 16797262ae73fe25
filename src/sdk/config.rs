// SPDX-License-Identifier: MIT

//! Engine configuration
//!
//! Values come from code or from the environment (`BASELINE_*` variables).

use crate::sdk::error::BaselineError;
use crate::sdk::timeout::Timeout;
use std::collections::HashMap;

pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

const ENV_MAX_CONCURRENCY: &str = "BASELINE_MAX_CONCURRENCY";
const ENV_DEFAULT_TIMEOUT: &str = "BASELINE_DEFAULT_TIMEOUT";
const ENV_HOST_OS: &str = "BASELINE_HOST_OS";
const ENV_HOST_VERSION: &str = "BASELINE_HOST_VERSION";
const ENV_HOST_PRODUCT: &str = "BASELINE_HOST_PRODUCT";

/// Description of the machine a workflow is about to run against
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HostProfile {
    pub os_family: String,
    pub version: String,
    pub product: Option<String>,
}

impl HostProfile {
    pub fn new(os_family: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            os_family: os_family.into(),
            version: version.into(),
            product: None,
        }
    }

    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = Some(product.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Upper bound on concurrently running Independent rules
    pub max_concurrency: usize,
    /// Timeout used when neither the rule nor the workflow sets one
    pub default_timeout: Option<Timeout>,
    /// When set, workflows are checked for applicability before running
    pub host: Option<HostProfile>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            default_timeout: None,
            host: None,
        }
    }
}

impl EngineConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, BaselineError> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Read configuration from a variable map
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, BaselineError> {
        let mut config = Self::default();

        if let Some(raw) = non_empty(vars, ENV_MAX_CONCURRENCY) {
            let parsed = raw.parse::<usize>().map_err(|_| {
                BaselineError::config(format!(
                    "{} must be a positive integer, got '{}'",
                    ENV_MAX_CONCURRENCY, raw
                ))
            })?;
            config.max_concurrency = parsed;
        }

        if let Some(raw) = non_empty(vars, ENV_DEFAULT_TIMEOUT) {
            let timeout = raw
                .parse::<Timeout>()
                .map_err(|e| BaselineError::config(format!("{}: {}", ENV_DEFAULT_TIMEOUT, e)))?;
            config.default_timeout = Some(timeout);
        }

        if let Some(os_family) = non_empty(vars, ENV_HOST_OS) {
            let version = non_empty(vars, ENV_HOST_VERSION).ok_or_else(|| {
                BaselineError::config(format!(
                    "{} is set but {} is missing",
                    ENV_HOST_OS, ENV_HOST_VERSION
                ))
            })?;
            let mut host = HostProfile::new(os_family, version);
            host.product = non_empty(vars, ENV_HOST_PRODUCT).map(str::to_string);
            config.host = Some(host);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Timeout) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    pub fn with_host(mut self, host: HostProfile) -> Self {
        self.host = Some(host);
        self
    }

    /// Reject settings the scheduler cannot honor
    pub fn validate(&self) -> Result<(), BaselineError> {
        if self.max_concurrency == 0 {
            return Err(BaselineError::config("max_concurrency must be at least 1"));
        }
        if self.default_timeout.is_some_and(|t| t.is_zero()) {
            return Err(BaselineError::config("default_timeout must be positive"));
        }
        Ok(())
    }
}

fn non_empty<'a>(vars: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}
