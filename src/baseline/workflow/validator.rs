// SPDX-License-Identifier: MIT

//! Workflow validation
//!
//! Checks a workflow against its structural contract and compiles it into an
//! [`ExecutionPlan`]. Every problem is collected; nothing short-circuits, so a
//! single pass reports the whole document.

use std::sync::Arc;

use super::condition::CompiledCondition;
use super::graph::{DependencyGraph, NodeSpec};
use super::params;
use super::plan::{ExecutionPlan, PlannedRule};
use super::types::{RunMode, Workflow};
use crate::sdk::error::{ValidationError, ValidationReport};

pub const MAX_SEVERITY: i64 = 10;

/// Validate `workflow` and build its execution plan
pub fn validate(workflow: &Workflow) -> Result<ExecutionPlan, ValidationReport> {
    let mut errors = Vec::new();

    if workflow.workflow_name.trim().is_empty() {
        errors.push(ValidationError::missing("WorkflowName"));
    }
    if workflow.rules.is_empty() {
        errors.push(ValidationError::NoRules);
    }
    if workflow.constraints.timeout.is_some_and(|t| t.is_zero()) {
        errors.push(ValidationError::ZeroTimeout {
            field: "Constraints.Timeout".to_string(),
        });
    }

    let run_sequentially = workflow.constraints.run_sequentially;
    let mut planned = Vec::with_capacity(workflow.rules.len());
    let mut nodes = Vec::with_capacity(workflow.rules.len());

    for (index, rule) in workflow.rules.iter().enumerate() {
        let field = format!("Rules[{}]", index);
        let before = errors.len();

        if rule.rule_name.trim().is_empty() {
            errors.push(ValidationError::missing(format!("{}.RuleName", field)));
        }
        if !(0..=MAX_SEVERITY).contains(&rule.severity) {
            errors.push(ValidationError::SeverityOutOfRange {
                field: format!("{}.Severity", field),
                value: rule.severity,
            });
        }
        if let RunMode::Unrecognized(value) = &rule.execution.run_mode {
            errors.push(ValidationError::UnknownRunMode {
                field: format!("{}.Execution.RunMode", field),
                value: value.clone(),
            });
        }
        if rule.execution.timeout.is_some_and(|t| t.is_zero()) {
            errors.push(ValidationError::ZeroTimeout {
                field: format!("{}.Execution.Timeout", field),
            });
        }

        let condition = match &rule.condition {
            Some(condition) => {
                CompiledCondition::compile(condition, &format!("{}.Condition", field))
                    .map_err(|e| errors.extend(e))
                    .ok()
            }
            None => {
                errors.push(ValidationError::missing(format!("{}.Condition", field)));
                None
            }
        };

        let parameters = if rule.provider.is_recognized() {
            params::resolve(rule, index)
                .map_err(|e| errors.push(e.into()))
                .ok()
        } else if rule.provider.is_missing() {
            errors.push(ValidationError::missing(format!("{}.Provider", field)));
            None
        } else {
            errors.push(ValidationError::UnknownProvider {
                field: format!("{}.Provider", field),
                value: rule.provider.to_string(),
            });
            None
        };

        let sequential = run_sequentially || rule.execution.run_mode.is_sequential();
        nodes.push(NodeSpec {
            name: rule.rule_name.clone(),
            depends_on: rule.execution.depends_on.clone(),
            sequential,
        });

        if errors.len() > before {
            continue;
        }
        if let (Some(condition), Some(parameters)) = (condition, parameters) {
            planned.push(Arc::new(PlannedRule {
                index,
                name: rule.rule_name.clone(),
                parameters,
                condition,
                severity: rule.severity as u8,
                message: rule.message.clone(),
                tags: rule.tags.clone(),
                run_mode: if sequential {
                    RunMode::Sequential
                } else {
                    RunMode::Independent
                },
                timeout: rule.execution.timeout.or(workflow.constraints.timeout),
                stop_on_failure: rule.execution.stop_on_failure
                    || workflow.constraints.stop_on_failure,
            }));
        }
    }

    let graph = match DependencyGraph::build(&nodes) {
        Ok(graph) if errors.is_empty() => graph,
        Ok(_) => return Err(reject(workflow, errors)),
        Err(graph_errors) => {
            errors.extend(graph_errors);
            return Err(reject(workflow, errors));
        }
    };

    log::debug!(
        "Validated workflow '{}': {} rules, order {:?}",
        workflow.workflow_name,
        planned.len(),
        graph.ordered_names()
    );

    Ok(ExecutionPlan {
        workflow_name: workflow.workflow_name.clone(),
        schema_version: workflow.schema_version.clone(),
        rules: planned,
        graph,
    })
}

fn reject(workflow: &Workflow, errors: Vec<ValidationError>) -> ValidationReport {
    log::debug!(
        "Workflow '{}' failed validation: {} error(s)",
        workflow.workflow_name,
        errors.len()
    );
    ValidationReport::new(errors)
}
