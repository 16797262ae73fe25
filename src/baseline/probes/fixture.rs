// SPDX-License-Identifier: MIT

//! Canned probe answers
//!
//! A fixture file maps rule names to what the probe should report:
//!
//! ```yaml
//! SpoolerDisabled: Stopped
//! SmbSigning: 1
//! BrokenRule:
//!   $error: access denied
//! ```
//!
//! Rules missing from the map observe nothing.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::sdk::error::{BaselineError, ProbeError};
use crate::sdk::probe::{Observation, Probe, ProbeRequest};

/// One canned answer
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FixtureAnswer {
    /// The probe fails with this message
    Error {
        #[serde(rename = "$error")]
        error: String,
    },
    Value(Value),
}

/// Probe that answers every provider from a fixture map
#[derive(Debug, Clone, Default)]
pub struct FixtureProbe {
    answers: HashMap<String, FixtureAnswer>,
}

impl FixtureProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load answers from a JSON or YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, BaselineError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let answers = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            _ => serde_yaml::from_str(&content)?,
        };
        Ok(Self { answers })
    }

    /// Build from a mapping of rule name to answer
    pub fn from_value(value: Value) -> Result<Self, BaselineError> {
        Ok(Self {
            answers: serde_json::from_value(value)?,
        })
    }

    pub fn with_value(mut self, rule: impl Into<String>, value: impl Into<Value>) -> Self {
        self.answers
            .insert(rule.into(), FixtureAnswer::Value(value.into()));
        self
    }

    pub fn with_error(mut self, rule: impl Into<String>, error: impl Into<String>) -> Self {
        self.answers.insert(
            rule.into(),
            FixtureAnswer::Error {
                error: error.into(),
            },
        );
        self
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

#[async_trait]
impl Probe for FixtureProbe {
    fn name(&self) -> &str {
        "fixture"
    }

    async fn observe(&self, request: ProbeRequest) -> Result<Observation, ProbeError> {
        match self.answers.get(&request.rule_name) {
            Some(FixtureAnswer::Value(value)) => Ok(Some(value.clone())),
            Some(FixtureAnswer::Error { error }) => {
                Err(ProbeError::failed(request.provider(), error.clone()))
            }
            None => Ok(None),
        }
    }
}
