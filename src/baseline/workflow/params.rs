// SPDX-License-Identifier: MIT

//! Parameter resolution
//!
//! Turns a rule's raw `Parameters` mapping into the typed shape its `Provider`
//! requires. The provider picks the shape; the mapping is never inspected to
//! guess one.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::types::Rule;
use crate::sdk::error::ParameterError;
use crate::sdk::provider::{
    AclParameters, CustomParameters, EventLogParameters, FileSystemParameters, ProcessParameters,
    ProviderParameters, ProviderType, RegistryParameters, ServiceParameters, WmiParameters,
};

/// Resolve the parameters of the rule declared at `index`
pub fn resolve(rule: &Rule, index: usize) -> Result<ProviderParameters, ParameterError> {
    let error = |reason: String| ParameterError {
        field: format!("Rules[{}].Parameters", index),
        rule: rule.rule_name.clone(),
        provider: rule.provider.clone(),
        reason,
    };

    let raw = &rule.parameters;
    let resolved = match &rule.provider {
        ProviderType::Registry => {
            shape::<RegistryParameters>(raw).map(ProviderParameters::Registry)
        }
        ProviderType::FileSystem => {
            shape::<FileSystemParameters>(raw).map(ProviderParameters::FileSystem)
        }
        ProviderType::Acl => shape::<AclParameters>(raw).map(ProviderParameters::Acl),
        ProviderType::Wmi => shape::<WmiParameters>(raw).map(ProviderParameters::Wmi),
        ProviderType::EventLog => {
            shape::<EventLogParameters>(raw).map(ProviderParameters::EventLog)
        }
        ProviderType::Service => shape::<ServiceParameters>(raw).map(ProviderParameters::Service),
        ProviderType::Process => shape::<ProcessParameters>(raw).map(ProviderParameters::Process),
        ProviderType::Custom => shape::<CustomParameters>(raw).map(ProviderParameters::Custom),
        ProviderType::Unrecognized(name) => {
            Err(format!("no parameter shape for provider '{}'", name))
        }
    };
    resolved.map_err(error)
}

fn shape<T: DeserializeOwned>(raw: &Map<String, Value>) -> Result<T, String> {
    serde_json::from_value(Value::Object(raw.clone())).map_err(|e| e.to_string())
}
