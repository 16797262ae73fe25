// SPDX-License-Identifier: MIT

//! Condition operators

use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison applied between an expected and an observed value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    /// Substring for text, membership for sequences
    Contains,
    NotContains,
    /// Full-string regular expression match
    RegexMatch,
    /// The probe returned a value
    Exists,
    /// The probe returned no value
    NotExists,
    /// A name outside the operator set, kept so validation can report it
    Unrecognized(String),
}

impl Operator {
    pub const ALL: [Operator; 9] = [
        Operator::Equals,
        Operator::NotEquals,
        Operator::GreaterThan,
        Operator::LessThan,
        Operator::Contains,
        Operator::NotContains,
        Operator::RegexMatch,
        Operator::Exists,
        Operator::NotExists,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Operator::Equals => "Equals",
            Operator::NotEquals => "NotEquals",
            Operator::GreaterThan => "GreaterThan",
            Operator::LessThan => "LessThan",
            Operator::Contains => "Contains",
            Operator::NotContains => "NotContains",
            Operator::RegexMatch => "RegexMatch",
            Operator::Exists => "Exists",
            Operator::NotExists => "NotExists",
            Operator::Unrecognized(name) => name,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Operator::Unrecognized(_))
    }

    /// Whether the document left the operator out or blank
    pub fn is_missing(&self) -> bool {
        matches!(self, Operator::Unrecognized(name) if name.trim().is_empty())
    }

    /// Whether `Expected` must be present. Existence checks ignore it.
    pub fn requires_expected(&self) -> bool {
        !matches!(self, Operator::Exists | Operator::NotExists)
    }

    /// Whether both sides must be numeric
    pub fn is_ordering(&self) -> bool {
        matches!(self, Operator::GreaterThan | Operator::LessThan)
    }
}

impl Default for Operator {
    fn default() -> Self {
        Operator::Unrecognized(String::new())
    }
}

impl From<String> for Operator {
    fn from(name: String) -> Self {
        Operator::ALL
            .iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(name.trim()))
            .cloned()
            .unwrap_or(Operator::Unrecognized(name))
    }
}

impl From<&str> for Operator {
    fn from(name: &str) -> Self {
        Operator::from(name.to_string())
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
