// SPDX-License-Identifier: MIT

//! Schema types for compliance workflow documents
//!
//! These structs mirror the wire format: PascalCase field names, `$schema`
//! preserved, `Parameters` kept as a raw mapping until the provider resolves
//! it. Fields whose absence is a validation error (rather than a parse error)
//! default to empty so the validator can report every problem at once.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::applicability::Applicability;
use super::condition::Operator;
use super::results::RuleResult;
use crate::sdk::clock::Clock;
use crate::sdk::provider::{ProviderParameters, ProviderType};
use crate::sdk::timeout::Timeout;

pub const CURRENT_SCHEMA_VERSION: &str = "1.0";

fn default_schema_version() -> String {
    CURRENT_SCHEMA_VERSION.to_string()
}

/// Top-level workflow document
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct Workflow {
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default)]
    pub workflow_name: String,
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub applicability: Applicability,
    #[serde(default)]
    pub constraints: Constraints,
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// Written by the engine only; never read back from a document
    #[serde(default, skip_deserializing, skip_serializing_if = "Vec::is_empty")]
    results: Vec<RuleResult>,
}

impl Workflow {
    /// Create an empty workflow stamped with the clock's current time
    pub fn new(name: impl Into<String>, clock: &dyn Clock) -> Self {
        Self {
            schema: None,
            workflow_name: name.into(),
            schema_version: default_schema_version(),
            description: None,
            author: None,
            created_on: Some(clock.now()),
            applicability: Applicability::default(),
            constraints: Constraints::default(),
            rules: Vec::new(),
            results: Vec::new(),
        }
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_applicability(mut self, applicability: Applicability) -> Self {
        self.applicability = applicability;
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Results of the last run, in rule declaration order
    pub fn results(&self) -> &[RuleResult] {
        &self.results
    }

    /// Look up a rule by name
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.rule_name == name)
    }

    /// Look up the result of a rule by name
    pub fn result(&self, name: &str) -> Option<&RuleResult> {
        self.results.iter().find(|r| r.rule_name == name)
    }

    pub(crate) fn replace_results(&mut self, results: Vec<RuleResult>) {
        self.results = results;
    }
}

/// Workflow-wide execution constraints
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct Constraints {
    /// Run every rule alone, one at a time
    #[serde(default)]
    pub run_sequentially: bool,
    /// Stop dispatching after any rule fails
    #[serde(default)]
    pub stop_on_failure: bool,
    /// Probe timeout for rules that set none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Timeout>,
}

/// A single compliance rule
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct Rule {
    #[serde(default)]
    pub rule_name: String,
    #[serde(default, skip_serializing_if = "ProviderType::is_missing")]
    #[schemars(with = "String")]
    pub provider: ProviderType,
    /// Shape depends on `provider`; resolved before execution
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub severity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub execution: ExecutionOptions,
}

impl Rule {
    /// Create a rule whose provider is taken from its parameters
    pub fn new(
        name: impl Into<String>,
        parameters: ProviderParameters,
        condition: Condition,
    ) -> Self {
        Self {
            rule_name: name.into(),
            provider: parameters.provider(),
            parameters: parameters.to_map(),
            condition: Some(condition),
            severity: 0,
            message: None,
            tags: Vec::new(),
            execution: ExecutionOptions::default(),
        }
    }

    pub fn with_severity(mut self, severity: i64) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    pub fn depends_on(mut self, rule: impl Into<String>) -> Self {
        self.execution.depends_on.push(rule.into());
        self
    }

    pub fn sequential(mut self) -> Self {
        self.execution.run_mode = RunMode::Sequential;
        self
    }

    pub fn with_timeout(mut self, timeout: Timeout) -> Self {
        self.execution.timeout = Some(timeout);
        self
    }

    pub fn stop_on_failure(mut self) -> Self {
        self.execution.stop_on_failure = true;
        self
    }
}

/// Assertion applied to the probed value
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct Condition {
    #[serde(default, skip_serializing_if = "Operator::is_missing")]
    #[schemars(with = "String")]
    pub operator: Operator,
    /// Absent and `null` are distinct: `null` is a value to compare with
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub expected: Option<Value>,
}

impl Condition {
    pub fn new(operator: Operator, expected: Option<Value>) -> Self {
        Self { operator, expected }
    }

    pub fn equals(expected: impl Into<Value>) -> Self {
        Self::new(Operator::Equals, Some(expected.into()))
    }

    pub fn exists() -> Self {
        Self::new(Operator::Exists, None)
    }
}

fn present_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

/// Per-rule execution options
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct ExecutionOptions {
    #[serde(default)]
    #[schemars(with = "String")]
    pub run_mode: RunMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Timeout>,
    #[serde(default)]
    pub stop_on_failure: bool,
    /// Rules that must finish before this one starts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

/// How a rule shares the worker pool
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum RunMode {
    /// May run alongside other independent rules (default)
    #[default]
    Independent,
    /// Runs alone on the exclusive lane
    Sequential,
    Unrecognized(String),
}

impl RunMode {
    pub fn as_str(&self) -> &str {
        match self {
            RunMode::Independent => "Independent",
            RunMode::Sequential => "Sequential",
            RunMode::Unrecognized(name) => name,
        }
    }

    pub fn is_sequential(&self) -> bool {
        matches!(self, RunMode::Sequential)
    }
}

impl From<String> for RunMode {
    fn from(name: String) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "independent" => RunMode::Independent,
            "sequential" => RunMode::Sequential,
            _ => RunMode::Unrecognized(name),
        }
    }
}

impl From<RunMode> for String {
    fn from(mode: RunMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::clock::FixedClock;
    use crate::sdk::provider::ServiceParameters;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_rule_deserialize_minimal() {
        let rule: Rule = serde_json::from_value(json!({
            "RuleName": "SpoolerRunning",
            "Provider": "Service",
            "Parameters": { "ServiceName": "Spooler" },
            "Condition": { "Operator": "Equals", "Expected": "Running" }
        }))
        .unwrap();

        assert_eq!(rule.rule_name, "SpoolerRunning");
        assert_eq!(rule.provider, ProviderType::Service);
        let condition = rule.condition.as_ref().unwrap();
        assert_eq!(condition.operator, Operator::Equals);
        assert_eq!(condition.expected, Some(json!("Running")));
        assert_eq!(rule.severity, 0);
        assert_eq!(rule.execution, ExecutionOptions::default());
    }

    #[test]
    fn test_expected_null_is_not_absent() {
        let condition: Condition =
            serde_json::from_value(json!({ "Operator": "Equals", "Expected": null })).unwrap();
        assert_eq!(condition.expected, Some(Value::Null));

        let condition: Condition = serde_json::from_value(json!({ "Operator": "Exists" })).unwrap();
        assert_eq!(condition.expected, None);
    }

    #[test]
    fn test_execution_options_deserialize() {
        let yaml = r#"
            RunMode: sequential
            Timeout: 30s
            StopOnFailure: true
            DependsOn:
              - RuleA
              - RuleB
        "#;
        let options: ExecutionOptions = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(options.run_mode, RunMode::Sequential);
        assert_eq!(options.timeout, Some(Timeout::from_secs(30)));
        assert!(options.stop_on_failure);
        assert_eq!(options.depends_on, vec!["RuleA", "RuleB"]);
    }

    #[test]
    fn test_unknown_run_mode_is_kept() {
        let options: ExecutionOptions =
            serde_json::from_value(json!({ "RunMode": "Parallel" })).unwrap();
        assert_eq!(
            options.run_mode,
            RunMode::Unrecognized("Parallel".to_string())
        );
    }

    #[test]
    fn test_rule_new_derives_provider() {
        let rule = Rule::new(
            "Spooler",
            ProviderParameters::Service(ServiceParameters {
                service_name: "Spooler".to_string(),
                expected_status: None,
            }),
            Condition::equals("Running"),
        )
        .with_tag("print")
        .with_tag("print");

        assert_eq!(rule.provider, ProviderType::Service);
        assert_eq!(rule.parameters.get("ServiceName"), Some(&json!("Spooler")));
        assert_eq!(rule.tags, vec!["print"]);
    }

    #[test]
    fn test_workflow_new_uses_clock() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let workflow = Workflow::new("Baseline", &FixedClock::new(at));
        assert_eq!(workflow.created_on, Some(at));
        assert_eq!(workflow.schema_version, CURRENT_SCHEMA_VERSION);
        assert!(workflow.results().is_empty());
    }

    #[test]
    fn test_workflow_schema_field_round_trips() {
        let workflow: Workflow = serde_json::from_value(json!({
            "$schema": "https://example.com/workflow.schema.json",
            "WorkflowName": "W",
            "Rules": []
        }))
        .unwrap();
        assert_eq!(
            workflow.schema.as_deref(),
            Some("https://example.com/workflow.schema.json")
        );

        let value = serde_json::to_value(&workflow).unwrap();
        assert_eq!(value["$schema"], "https://example.com/workflow.schema.json");
        assert!(value.get("Results").is_none());
    }

    #[test]
    fn test_missing_provider_and_operator_still_parse() {
        let rule: Rule = serde_json::from_value(json!({
            "RuleName": "Bare",
            "Condition": { "Expected": 1 }
        }))
        .unwrap();
        assert!(rule.provider.is_missing());
        assert!(rule.condition.as_ref().unwrap().operator.is_missing());

        let rule: Rule = serde_json::from_value(json!({ "RuleName": "NoCondition" })).unwrap();
        assert_eq!(rule.condition, None);

        let value = serde_json::to_value(&rule).unwrap();
        assert!(value.get("Provider").is_none());
        assert!(value.get("Condition").is_none());
    }

    #[test]
    fn test_results_are_not_read_from_documents() {
        let workflow: Workflow = serde_json::from_value(json!({
            "WorkflowName": "W",
            "Rules": [],
            "Results": [{
                "RuleName": "Forged",
                "Success": true,
                "Status": "Passed",
                "Message": "ok",
                "SeverityScore": 0,
                "Timestamp": "2024-05-01T12:00:00Z",
                "SchemaVersion": "1.0",
                "ExecutionMode": "Independent"
            }]
        }))
        .unwrap();
        assert!(workflow.results().is_empty());
    }
}
