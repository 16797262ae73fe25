// SPDX-License-Identifier: MIT

//! Rule results and their aggregation
//!
//! Results arrive in completion order; the final list is always reordered to
//! match rule declaration order.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::types::RunMode;

/// Category of a rule outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
pub enum RuleStatus {
    /// Condition held
    Passed,
    /// Condition evaluated to false
    Failed,
    /// Condition could not be applied to the observed value
    EvaluationError,
    /// The probe failed to produce a value
    ProbeError,
    /// The probe exceeded its timeout
    TimedOut,
    /// Never started because an earlier failure halted the run
    Skipped,
}

impl RuleStatus {
    /// Whether the rule ran and did not pass
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            RuleStatus::Failed
                | RuleStatus::EvaluationError
                | RuleStatus::ProbeError
                | RuleStatus::TimedOut
        )
    }

    /// Failure caused by the probing infrastructure rather than the condition
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, RuleStatus::ProbeError | RuleStatus::TimedOut)
    }
}

/// Outcome of one rule. Created once, never modified.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct RuleResult {
    pub rule_name: String,
    pub success: bool,
    pub status: RuleStatus,
    pub message: String,
    pub severity_score: u8,
    pub timestamp: DateTime<Utc>,
    pub schema_version: String,
    #[schemars(with = "String")]
    pub execution_mode: RunMode,
    #[serde(default)]
    pub duration_ms: u64,
}

/// Counts over a result set
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub evaluation_errors: usize,
    pub probe_errors: usize,
    pub timed_out: usize,
    pub skipped: usize,
    /// Highest severity among rules that ran and did not pass
    pub highest_failure_severity: Option<u8>,
}

impl Summary {
    pub fn from_results(results: &[RuleResult]) -> Self {
        let mut summary = Summary {
            total: results.len(),
            ..Default::default()
        };

        for result in results {
            match result.status {
                RuleStatus::Passed => summary.passed += 1,
                RuleStatus::Failed => summary.failed += 1,
                RuleStatus::EvaluationError => summary.evaluation_errors += 1,
                RuleStatus::ProbeError => summary.probe_errors += 1,
                RuleStatus::TimedOut => summary.timed_out += 1,
                RuleStatus::Skipped => summary.skipped += 1,
            }
            if result.status.is_failure() {
                summary.highest_failure_severity = summary
                    .highest_failure_severity
                    .max(Some(result.severity_score));
            }
        }

        summary
    }

    /// Rules that ran and did not pass
    pub fn failures(&self) -> usize {
        self.failed + self.evaluation_errors + self.probe_errors + self.timed_out
    }

    /// Every rule passed
    pub fn is_compliant(&self) -> bool {
        self.total > 0 && self.passed == self.total
    }
}

/// Collects results as rules finish
#[derive(Debug, Default)]
pub struct ResultAggregator {
    completed: Vec<(usize, RuleResult)>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the result of the rule declared at `index`
    pub fn record(&mut self, index: usize, result: RuleResult) {
        self.completed.push((index, result));
    }

    /// Results in completion order
    pub fn completed(&self) -> impl Iterator<Item = &RuleResult> {
        self.completed.iter().map(|(_, r)| r)
    }

    pub fn len(&self) -> usize {
        self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
    }

    /// Final results in declaration order
    pub fn finalize(mut self) -> Vec<RuleResult> {
        self.completed.sort_by_key(|(index, _)| *index);
        self.completed.into_iter().map(|(_, r)| r).collect()
    }
}

/// Reorder `results` to follow `declared` rule names.
///
/// Results for names not in `declared` keep their relative order at the end.
pub fn aggregate(results: Vec<RuleResult>, declared: &[String]) -> (Vec<RuleResult>, Summary) {
    let position: HashMap<&str, usize> = declared
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect();

    let mut ordered = results;
    ordered.sort_by_key(|r| {
        position
            .get(r.rule_name.as_str())
            .copied()
            .unwrap_or(usize::MAX)
    });
    let summary = Summary::from_results(&ordered);
    (ordered, summary)
}
