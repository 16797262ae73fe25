// SPDX-License-Identifier: MIT

//! Graph workflow executor
//!
//! The scheduler is the only owner of run state (readiness counters, the
//! in-flight count and the halt flag). Rule evaluations run as tasks on a
//! `JoinSet` and report back through it, so every completion updates
//! readiness in one place.
//!
//! Dispatch policy, scanning ready rules in dependency order:
//! - an Independent rule starts while fewer than `max_concurrency` rules are
//!   running and no Sequential rule is running;
//! - a Sequential rule starts only when nothing is running, and nothing else
//!   starts until it finishes. A waiting Sequential rule also stops later
//!   rules from starting, so the lane is never starved.

use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::baseline::workflow::plan::{ExecutionPlan, PlannedRule};
use crate::baseline::workflow::results::{ResultAggregator, RuleResult, RuleStatus};
use crate::sdk::clock::Clock;
use crate::sdk::config::DEFAULT_MAX_CONCURRENCY;
use crate::sdk::error::{BaselineError, ProbeError};
use crate::sdk::probe::{Observation, Probe, ProbeRequest};
use crate::sdk::provider::ProviderType;
use crate::sdk::timeout::Timeout;

/// Drives an [`ExecutionPlan`] to completion
pub struct Scheduler {
    probes: HashMap<ProviderType, Arc<dyn Probe>>,
    clock: Arc<dyn Clock>,
    max_concurrency: usize,
    default_timeout: Option<Timeout>,
}

impl Scheduler {
    pub fn new(probes: HashMap<ProviderType, Arc<dyn Probe>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            probes,
            clock,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            default_timeout: None,
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_default_timeout(mut self, timeout: Option<Timeout>) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Run every rule of `plan` and return one result per rule, in
    /// declaration order.
    ///
    /// Rules left unstarted because a stop-on-failure rule failed are
    /// returned as `Skipped`.
    pub async fn execute(&self, plan: &ExecutionPlan) -> Result<Vec<RuleResult>, BaselineError> {
        let graph = &plan.graph;
        let mut pending: Vec<usize> = (0..plan.len()).map(|i| graph.waits_for(i).len()).collect();
        let mut started = vec![false; plan.len()];
        let mut in_flight = 0usize;
        let mut exclusive = false;
        let mut halted_by: Option<String> = None;
        let mut aggregator = ResultAggregator::new();
        let mut tasks: JoinSet<(usize, RuleResult)> = JoinSet::new();

        log::info!(
            "Executing workflow '{}': {} rules, max concurrency {}",
            plan.workflow_name,
            plan.len(),
            self.max_concurrency
        );

        loop {
            if halted_by.is_none() && !exclusive {
                for &node in graph.order() {
                    if started[node] || pending[node] > 0 {
                        continue;
                    }
                    let rule = &plan.rules[node];
                    if rule.is_sequential() {
                        if in_flight == 0 {
                            self.dispatch(&mut tasks, rule, &plan.schema_version);
                            started[node] = true;
                            in_flight += 1;
                            exclusive = true;
                        }
                        break;
                    }
                    if in_flight >= self.max_concurrency {
                        break;
                    }
                    self.dispatch(&mut tasks, rule, &plan.schema_version);
                    started[node] = true;
                    in_flight += 1;
                }
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };
            let (node, result) = joined
                .map_err(|e| BaselineError::Scheduler(format!("rule task failed: {}", e)))?;
            in_flight -= 1;

            let rule = &plan.rules[node];
            if rule.is_sequential() {
                exclusive = false;
            }
            for &dependent in graph.dependents(node) {
                pending[dependent] -= 1;
                if pending[dependent] == 0 {
                    log::debug!("Rule {} is ready", graph.name(dependent));
                }
            }

            if result.success {
                log::info!("Rule {} passed", rule.name);
            } else {
                log::warn!("Rule {} {:?}: {}", rule.name, result.status, result.message);
                if rule.stop_on_failure && halted_by.is_none() {
                    log::warn!(
                        "Rule {} failed with stop-on-failure set; halting dispatch",
                        rule.name
                    );
                    halted_by = Some(rule.name.clone());
                }
            }
            aggregator.record(node, result);
        }

        for (node, rule) in plan.rules.iter().enumerate() {
            if started[node] {
                continue;
            }
            let Some(halted_by) = &halted_by else {
                return Err(BaselineError::Scheduler(format!(
                    "rule '{}' was never dispatched",
                    rule.name
                )));
            };
            log::warn!("Skipping rule {}", rule.name);
            aggregator.record(node, self.skipped(rule, halted_by, &plan.schema_version));
        }

        log::info!(
            "Workflow '{}' finished: {} results",
            plan.workflow_name,
            aggregator.len()
        );
        Ok(aggregator.finalize())
    }

    fn dispatch(
        &self,
        tasks: &mut JoinSet<(usize, RuleResult)>,
        rule: &Arc<PlannedRule>,
        schema_version: &str,
    ) {
        let timeout = rule.timeout.or(self.default_timeout);
        log::info!(
            "Dispatching rule {} ({}, timeout {})",
            rule.name,
            rule.run_mode,
            timeout.map_or_else(|| "none".to_string(), |t| t.to_string())
        );

        let job = RuleJob {
            rule: Arc::clone(rule),
            probe: self.probes.get(&rule.parameters.provider()).cloned(),
            clock: Arc::clone(&self.clock),
            timeout,
            schema_version: schema_version.to_string(),
        };
        let index = rule.index;
        tasks.spawn(async move { (index, job.run().await) });
    }

    fn skipped(&self, rule: &PlannedRule, halted_by: &str, schema_version: &str) -> RuleResult {
        RuleResult {
            rule_name: rule.name.clone(),
            success: false,
            status: RuleStatus::Skipped,
            message: format!("skipped: halted after rule '{}' failed", halted_by),
            severity_score: rule.severity,
            timestamp: self.clock.now(),
            schema_version: schema_version.to_string(),
            execution_mode: rule.run_mode.clone(),
            duration_ms: 0,
        }
    }
}

/// Everything one rule evaluation needs, owned so it can move into a task
struct RuleJob {
    rule: Arc<PlannedRule>,
    probe: Option<Arc<dyn Probe>>,
    clock: Arc<dyn Clock>,
    timeout: Option<Timeout>,
    schema_version: String,
}

enum Interrupted {
    Probe(ProbeError),
    TimedOut(Timeout),
}

impl RuleJob {
    async fn run(self) -> RuleResult {
        let began = Instant::now();

        let (status, detail) = match self.observe().await {
            Ok(observation) => match self.rule.condition.evaluate(observation.as_ref()) {
                Ok(evaluation) if evaluation.passed => (RuleStatus::Passed, evaluation.explanation),
                Ok(evaluation) => (RuleStatus::Failed, evaluation.explanation),
                Err(e) => (
                    RuleStatus::EvaluationError,
                    format!("evaluation error: {}", e),
                ),
            },
            Err(Interrupted::Probe(e)) => (RuleStatus::ProbeError, format!("probe error: {}", e)),
            Err(Interrupted::TimedOut(t)) => {
                (RuleStatus::TimedOut, format!("timed out after {}", t))
            }
        };

        let message = match (&self.rule.message, status) {
            (Some(message), status) if status != RuleStatus::Passed => {
                format!("{}: {}", message, detail)
            }
            _ => detail,
        };

        RuleResult {
            rule_name: self.rule.name.clone(),
            success: status == RuleStatus::Passed,
            status,
            message,
            severity_score: self.rule.severity,
            timestamp: self.clock.now(),
            schema_version: self.schema_version.clone(),
            execution_mode: self.rule.run_mode.clone(),
            duration_ms: began.elapsed().as_millis() as u64,
        }
    }

    async fn observe(&self) -> Result<Observation, Interrupted> {
        let provider = self.rule.parameters.provider();
        let probe = self
            .probe
            .as_ref()
            .ok_or_else(|| Interrupted::Probe(ProbeError::NotRegistered(provider)))?;

        let cancellation = CancellationToken::new();
        let request = ProbeRequest {
            rule_name: self.rule.name.clone(),
            parameters: self.rule.parameters.clone(),
            cancellation: cancellation.clone(),
        };
        let observed = AssertUnwindSafe(probe.observe(request)).catch_unwind();

        let outcome = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout.duration(), observed).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    cancellation.cancel();
                    return Err(Interrupted::TimedOut(timeout));
                }
            },
            None => observed.await,
        };

        match outcome {
            Ok(result) => result.map_err(Interrupted::Probe),
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                log::error!(
                    "Probe {} panicked on rule {}: {}",
                    probe.name(),
                    self.rule.name,
                    reason
                );
                Err(Interrupted::Probe(ProbeError::Panicked(reason)))
            }
        }
    }
}
