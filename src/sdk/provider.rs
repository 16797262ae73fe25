// SPDX-License-Identifier: MIT

//! Provider types and their typed parameter shapes
//!
//! A rule names exactly one provider, and the provider fixes the shape of the
//! rule's `Parameters`. `ProviderParameters` is the resolved, tagged form that
//! probes receive; it can only be produced with a tag that agrees with its
//! shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The OS subsystem a rule probes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum ProviderType {
    Registry,
    FileSystem,
    Acl,
    Wmi,
    EventLog,
    Service,
    Process,
    Custom,
    /// A name outside the provider set, kept so validation can report it
    Unrecognized(String),
}

impl ProviderType {
    /// Every recognized provider
    pub const ALL: [ProviderType; 8] = [
        ProviderType::Registry,
        ProviderType::FileSystem,
        ProviderType::Acl,
        ProviderType::Wmi,
        ProviderType::EventLog,
        ProviderType::Service,
        ProviderType::Process,
        ProviderType::Custom,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            ProviderType::Registry => "Registry",
            ProviderType::FileSystem => "FileSystem",
            ProviderType::Acl => "ACL",
            ProviderType::Wmi => "WMI",
            ProviderType::EventLog => "EventLog",
            ProviderType::Service => "Service",
            ProviderType::Process => "Process",
            ProviderType::Custom => "Custom",
            ProviderType::Unrecognized(name) => name,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, ProviderType::Unrecognized(_))
    }

    /// Whether the document left the provider out or blank
    pub fn is_missing(&self) -> bool {
        matches!(self, ProviderType::Unrecognized(name) if name.trim().is_empty())
    }
}

impl Default for ProviderType {
    fn default() -> Self {
        ProviderType::Unrecognized(String::new())
    }
}

impl From<String> for ProviderType {
    fn from(name: String) -> Self {
        ProviderType::ALL
            .iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(name.trim()))
            .cloned()
            .unwrap_or(ProviderType::Unrecognized(name))
    }
}

impl From<&str> for ProviderType {
    fn from(name: &str) -> Self {
        ProviderType::from(name.to_string())
    }
}

impl From<ProviderType> for String {
    fn from(provider: ProviderType) -> Self {
        provider.as_str().to_string()
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Registry hive, written in its short or long Windows form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum RegistryHive {
    #[serde(rename = "HKLM", alias = "HKEY_LOCAL_MACHINE")]
    LocalMachine,
    #[serde(rename = "HKCU", alias = "HKEY_CURRENT_USER")]
    CurrentUser,
    #[serde(rename = "HKCR", alias = "HKEY_CLASSES_ROOT")]
    ClassesRoot,
    #[serde(rename = "HKU", alias = "HKEY_USERS")]
    Users,
    #[serde(rename = "HKCC", alias = "HKEY_CURRENT_CONFIG")]
    CurrentConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct RegistryParameters {
    pub hive: RegistryHive,
    pub path: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct FileSystemParameters {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<String>,
    #[serde(default)]
    pub recursive: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct AclParameters {
    pub path: String,
    pub identity: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct WmiParameters {
    #[serde(default = "default_wmi_namespace")]
    pub namespace: String,
    pub class: String,
    pub property: String,
}

fn default_wmi_namespace() -> String {
    "root\\cimv2".to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct EventLogParameters {
    pub log_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct ServiceParameters {
    pub service_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct ProcessParameters {
    pub process_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_count: Option<u32>,
}

/// Free-form values interpreted only by the custom probe
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct CustomParameters {
    pub values: Map<String, Value>,
}

/// Resolved parameters, one variant per provider
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProviderParameters {
    Registry(RegistryParameters),
    FileSystem(FileSystemParameters),
    Acl(AclParameters),
    Wmi(WmiParameters),
    EventLog(EventLogParameters),
    Service(ServiceParameters),
    Process(ProcessParameters),
    Custom(CustomParameters),
}

impl ProviderParameters {
    /// The provider this shape belongs to
    pub fn provider(&self) -> ProviderType {
        match self {
            ProviderParameters::Registry(_) => ProviderType::Registry,
            ProviderParameters::FileSystem(_) => ProviderType::FileSystem,
            ProviderParameters::Acl(_) => ProviderType::Acl,
            ProviderParameters::Wmi(_) => ProviderType::Wmi,
            ProviderParameters::EventLog(_) => ProviderType::EventLog,
            ProviderParameters::Service(_) => ProviderType::Service,
            ProviderParameters::Process(_) => ProviderType::Process,
            ProviderParameters::Custom(_) => ProviderType::Custom,
        }
    }

    /// The document form of these parameters
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}
