// SPDX-License-Identifier: MIT

//! Workflow loader - JSON/YAML file loading and parsing
//!
//! This module handles loading workflow documents from disk and writing them
//! back out. Parsing only checks shape; use the validator for the contract.

use super::types::Workflow;
use crate::sdk::error::BaselineError;
use schemars::schema::RootSchema;
use std::fs;
use std::path::Path;

/// Loads workflow documents from JSON or YAML files
pub struct WorkflowLoader;

impl WorkflowLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a workflow from a `.json`, `.yaml` or `.yml` file.
    ///
    /// Files with any other extension are tried as JSON first, then YAML.
    pub fn load_workflow<P: AsRef<Path>>(&self, path: P) -> Result<Workflow, BaselineError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        log::debug!("Loading workflow from {}", path.display());

        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => Self::parse_json(&content),
            Some("yaml") | Some("yml") => Self::parse_yaml(&content),
            _ => Self::parse_json(&content).or_else(|_| Self::parse_yaml(&content)),
        }
    }

    /// Parse a workflow from a JSON string
    pub fn parse_json(content: &str) -> Result<Workflow, BaselineError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Parse a workflow from a YAML string
    pub fn parse_yaml(content: &str) -> Result<Workflow, BaselineError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Serialize a workflow, including any results, as pretty JSON
    pub fn to_json(workflow: &Workflow) -> Result<String, BaselineError> {
        Ok(serde_json::to_string_pretty(workflow)?)
    }

    pub fn to_yaml(workflow: &Workflow) -> Result<String, BaselineError> {
        Ok(serde_yaml::to_string(workflow)?)
    }

    /// JSON Schema of the workflow document
    pub fn schema() -> RootSchema {
        schemars::schema_for!(Workflow)
    }
}

impl Default for WorkflowLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::workflow::condition::Operator;
    use crate::baseline::workflow::types::RunMode;
    use crate::sdk::provider::ProviderType;
    use crate::sdk::timeout::Timeout;
    use serde_json::json;

    const YAML: &str = r#"
WorkflowName: Server Baseline
SchemaVersion: "1.0"
Author: secops
Constraints:
  StopOnFailure: true
  Timeout: "00:00:30"
Rules:
  - RuleName: SpoolerDisabled
    Provider: service
    Parameters:
      ServiceName: Spooler
    Condition:
      Operator: equals
      Expected: Stopped
    Severity: 6
    Tags: [print, cis]
  - RuleName: SmbSigning
    Provider: Registry
    Parameters:
      Hive: HKLM
      Path: SYSTEM\CurrentControlSet\Services\LanmanServer\Parameters
      Key: RequireSecuritySignature
    Condition:
      Operator: Equals
      Expected: 1
    Execution:
      RunMode: Sequential
      DependsOn: [SpoolerDisabled]
"#;

    #[test]
    fn test_parse_yaml_workflow() {
        let workflow = WorkflowLoader::parse_yaml(YAML).unwrap();
        assert_eq!(workflow.workflow_name, "Server Baseline");
        assert_eq!(workflow.author.as_deref(), Some("secops"));
        assert_eq!(workflow.constraints.timeout, Some(Timeout::from_secs(30)));
        assert_eq!(workflow.rules.len(), 2);

        let first = &workflow.rules[0];
        assert_eq!(first.provider, ProviderType::Service);
        assert_eq!(first.condition.as_ref().unwrap().operator, Operator::Equals);
        assert_eq!(first.tags, vec!["print", "cis"]);

        let second = &workflow.rules[1];
        assert_eq!(second.execution.run_mode, RunMode::Sequential);
        assert_eq!(second.execution.depends_on, vec!["SpoolerDisabled"]);
        assert_eq!(second.condition.as_ref().unwrap().expected, Some(json!(1)));
    }

    #[test]
    fn test_json_round_trip() {
        let workflow = WorkflowLoader::parse_yaml(YAML).unwrap();
        let text = WorkflowLoader::to_json(&workflow).unwrap();
        let reparsed = WorkflowLoader::parse_json(&text).unwrap();
        assert_eq!(reparsed, workflow);

        let yaml = WorkflowLoader::to_yaml(&workflow).unwrap();
        assert_eq!(WorkflowLoader::parse_yaml(&yaml).unwrap(), workflow);
    }

    #[test]
    fn test_load_by_extension() {
        let dir = std::env::temp_dir().join(format!("baseline-loader-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();

        let yaml_path = dir.join("baseline.yml");
        fs::write(&yaml_path, YAML).unwrap();
        let from_yaml = WorkflowLoader::new().load_workflow(&yaml_path).unwrap();

        let json_path = dir.join("baseline.json");
        fs::write(&json_path, WorkflowLoader::to_json(&from_yaml).unwrap()).unwrap();
        let from_json = WorkflowLoader::new().load_workflow(&json_path).unwrap();
        assert_eq!(from_json, from_yaml);

        let missing = WorkflowLoader::new().load_workflow(dir.join("missing.json"));
        assert!(matches!(missing, Err(BaselineError::Io(_))));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_invalid_document_returns_error() {
        let yaml = r#"
WorkflowName:
  - invalid structure
"#;
        assert!(matches!(
            WorkflowLoader::parse_yaml(yaml),
            Err(BaselineError::Yaml(_))
        ));
        assert!(matches!(
            WorkflowLoader::parse_json("{ not json"),
            Err(BaselineError::Json(_))
        ));
    }

    #[test]
    fn test_schema_describes_rules() {
        let schema = serde_json::to_value(WorkflowLoader::schema()).unwrap();
        assert!(schema["properties"]["Rules"].is_object());
        assert!(schema["properties"]["WorkflowName"].is_object());
    }
}
