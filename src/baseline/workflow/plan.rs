// SPDX-License-Identifier: MIT

//! Execution plans
//!
//! A plan is what validation produces: every rule with its parameters
//! resolved, its condition compiled and its effective execution options
//! computed, plus the dependency graph. Only plans are ever executed.

use serde::Serialize;
use std::sync::Arc;

use super::condition::CompiledCondition;
use super::graph::DependencyGraph;
use super::types::RunMode;
use crate::sdk::provider::ProviderParameters;
use crate::sdk::timeout::Timeout;

/// A rule ready to be scheduled
#[derive(Debug, Clone)]
pub struct PlannedRule {
    /// Position in the workflow's `Rules`
    pub index: usize,
    pub name: String,
    pub parameters: ProviderParameters,
    pub condition: CompiledCondition,
    pub severity: u8,
    pub message: Option<String>,
    pub tags: Vec<String>,
    /// Sequential when the rule or the workflow asks for it
    pub run_mode: RunMode,
    /// Rule timeout, else the workflow's
    pub timeout: Option<Timeout>,
    /// Rule flag or workflow flag
    pub stop_on_failure: bool,
}

impl PlannedRule {
    pub fn is_sequential(&self) -> bool {
        self.run_mode.is_sequential()
    }
}

/// One dispatch step of a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Stage {
    /// Rules that may run together
    Concurrent(Vec<String>),
    /// A rule that runs alone
    Exclusive(String),
}

/// A validated workflow, ready to run
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub workflow_name: String,
    pub schema_version: String,
    pub rules: Vec<Arc<PlannedRule>>,
    pub graph: DependencyGraph,
}

impl ExecutionPlan {
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rule(&self, name: &str) -> Option<&PlannedRule> {
        self.graph
            .index_of(name)
            .map(|index| self.rules[index].as_ref())
    }

    /// Rule names in declaration order
    pub fn declared_names(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.name.clone()).collect()
    }

    /// The stages the scheduler walks through when every rule finishes
    /// instantly and nothing halts the run.
    ///
    /// A concurrent stage holds the ready independent rules that come before
    /// the first ready sequential rule; that rule then gets a stage of its own.
    pub fn stages(&self) -> Vec<Stage> {
        let graph = &self.graph;
        let mut pending: Vec<usize> = (0..graph.len()).map(|i| graph.waits_for(i).len()).collect();
        let mut done = vec![false; graph.len()];
        let mut stages = Vec::new();

        loop {
            let ready: Vec<usize> = graph
                .order()
                .iter()
                .copied()
                .filter(|&i| !done[i] && pending[i] == 0)
                .collect();
            let Some(&first) = ready.first() else {
                break;
            };

            let batch: Vec<usize> = if self.rules[first].is_sequential() {
                stages.push(Stage::Exclusive(self.rules[first].name.clone()));
                vec![first]
            } else {
                let batch: Vec<usize> = ready
                    .into_iter()
                    .take_while(|&i| !self.rules[i].is_sequential())
                    .collect();
                stages.push(Stage::Concurrent(
                    batch.iter().map(|&i| self.rules[i].name.clone()).collect(),
                ));
                batch
            };

            for node in batch {
                done[node] = true;
                for &dependent in graph.dependents(node) {
                    pending[dependent] -= 1;
                }
            }
        }

        stages
    }
}
