// SPDX-License-Identifier: MIT

//! Typed error handling for baseline-rs
//!
//! Validation-time errors (`ValidationError`, `ParameterError`, `CycleError`)
//! are collected into a `ValidationReport` and block execution. Execution-time
//! errors (`ProbeError`, `EvaluatorError`) are local to one rule and end up in
//! that rule's result.

use crate::sdk::provider::ProviderType;
use std::fmt;
use thiserror::Error;

/// Top-level error type for baseline-rs
#[derive(Debug, Error)]
pub enum BaselineError {
    /// The workflow failed validation; nothing was executed
    #[error(transparent)]
    Validation(#[from] ValidationReport),

    /// The workflow's applicability constraints exclude this host
    #[error("Workflow '{workflow}' is not applicable to this host: {reason}")]
    NotApplicable { workflow: String, reason: String },

    /// Configuration errors (invalid env vars, bad engine settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The scheduler lost track of a dispatched rule
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error wrapper
    #[error("{0}")]
    Other(String),
}

impl BaselineError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a not-applicable error
    pub fn not_applicable(workflow: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotApplicable {
            workflow: workflow.into(),
            reason: reason.into(),
        }
    }

    /// Create from a generic message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Validation errors carried by this error, if any
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            Self::Validation(report) => report.errors(),
            _ => &[],
        }
    }
}

impl From<&str> for BaselineError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl From<String> for BaselineError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

/// A single structural violation in a workflow document.
///
/// `field` is the document path of the offending field, e.g.
/// `Rules[2].Condition.Expected`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty
    #[error("{field}: required and must not be empty")]
    Missing { field: String },

    /// The workflow declares no rules
    #[error("Rules: workflow must contain at least one rule")]
    NoRules,

    /// Two rules share a name
    #[error("{field}: rule name '{name}' is already used by Rules[{first_index}]")]
    DuplicateRuleName {
        field: String,
        name: String,
        first_index: usize,
    },

    /// Severity outside 0..=10
    #[error("{field}: severity {value} is outside 0..=10")]
    SeverityOutOfRange { field: String, value: i64 },

    /// Provider name not in the provider set
    #[error("{field}: unknown provider '{value}'")]
    UnknownProvider { field: String, value: String },

    /// Operator name not in the operator set
    #[error("{field}: unknown operator '{value}'")]
    UnknownOperator { field: String, value: String },

    /// Run mode other than Independent or Sequential
    #[error("{field}: unknown run mode '{value}'")]
    UnknownRunMode { field: String, value: String },

    /// `Expected` omitted for an operator that compares against it
    #[error("{field}: required for operator {operator}")]
    MissingExpected { field: String, operator: String },

    /// `Expected` has the wrong type for its operator
    #[error("{field}: {reason}")]
    InvalidExpected { field: String, reason: String },

    /// A timeout of zero can never be met
    #[error("{field}: timeout must be greater than zero")]
    ZeroTimeout { field: String },

    /// `DependsOn` names a rule that does not exist
    #[error("{field}: rule '{rule}' depends on unknown rule '{dependency}'")]
    UnknownDependency {
        field: String,
        rule: String,
        dependency: String,
    },

    /// Parameters do not match the declared provider
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    /// The dependency graph contains a cycle
    #[error(transparent)]
    Cycle(#[from] CycleError),
}

impl ValidationError {
    /// Create a missing-field error
    pub fn missing(field: impl Into<String>) -> Self {
        Self::Missing {
            field: field.into(),
        }
    }
}

/// Parameters attached to a rule do not have the shape its provider requires
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field}: parameters do not match provider {provider}: {reason}")]
pub struct ParameterError {
    pub field: String,
    pub rule: String,
    pub provider: ProviderType,
    pub reason: String,
}

/// A dependency cycle; `rules` lists the members in edge order
#[derive(Debug, Clone, PartialEq)]
pub struct CycleError {
    pub rules: Vec<String>,
}

impl CycleError {
    /// Whether the named rule takes part in the cycle
    pub fn involves(&self, rule: &str) -> bool {
        self.rules.iter().any(|r| r == rule)
    }
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rules: dependency cycle ")?;
        for rule in &self.rules {
            write!(f, "{} -> ", rule)?;
        }
        match self.rules.first() {
            Some(first) => write!(f, "{}", first),
            None => write!(f, "(empty)"),
        }
    }
}

impl std::error::Error for CycleError {}

/// Every validation error found in one workflow. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    errors: Vec<ValidationError>,
}

impl ValidationReport {
    /// Wrap collected errors; `None` when there is nothing to report
    pub fn from_errors(errors: Vec<ValidationError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self { errors })
        }
    }

    /// Wrap errors already known to be non-empty
    pub(crate) fn new(errors: Vec<ValidationError>) -> Self {
        debug_assert!(!errors.is_empty());
        Self { errors }
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Cycle errors in the report
    pub fn cycles(&self) -> impl Iterator<Item = &CycleError> {
        self.errors.iter().filter_map(|e| match e {
            ValidationError::Cycle(c) => Some(c),
            _ => None,
        })
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "workflow validation failed with {} error(s)",
            self.errors.len()
        )?;
        for error in &self.errors {
            write!(f, "\n  - {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationReport {}

/// A probe could not produce an observation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProbeError {
    /// The host registered no probe for this provider
    #[error("no probe registered for provider {0}")]
    NotRegistered(ProviderType),

    /// The probe ran and reported a failure
    #[error("{provider} probe failed: {message}")]
    Failed {
        provider: ProviderType,
        message: String,
    },

    /// The probe does not handle these parameters
    #[error("{provider} probe does not support this request: {message}")]
    Unsupported {
        provider: ProviderType,
        message: String,
    },

    /// The probe observed its cancellation signal and gave up
    #[error("probe cancelled")]
    Cancelled,

    /// The probe panicked
    #[error("probe panicked: {0}")]
    Panicked(String),
}

impl ProbeError {
    /// Create a failure error
    pub fn failed(provider: ProviderType, message: impl Into<String>) -> Self {
        Self::Failed {
            provider,
            message: message.into(),
        }
    }

    /// Create an unsupported-request error
    pub fn unsupported(provider: ProviderType, message: impl Into<String>) -> Self {
        Self::Unsupported {
            provider,
            message: message.into(),
        }
    }
}

/// An operator cannot be applied to the values it was given
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluatorError {
    /// A side of the comparison has the wrong type
    #[error("type mismatch: {operator} requires {required}, got {actual}")]
    TypeMismatch {
        operator: String,
        required: &'static str,
        actual: String,
    },

    /// The probe returned no value for an operator that needs one
    #[error("{operator} requires an observed value but the probe returned none")]
    MissingObservation { operator: String },

    /// The condition has no expected value to compare against
    #[error("{operator} requires an expected value")]
    MissingExpected { operator: String },

    /// The expected pattern is not a valid regular expression
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// The operator is not one the evaluator knows
    #[error("unsupported operator '{0}'")]
    UnsupportedOperator(String),
}
