// SPDX-License-Identifier: MIT

//! Workflow engine - orchestrates validation and execution
//!
//! This module provides the high-level `Engine` that validates workflow
//! documents, checks them against the host and runs them with the registered
//! probes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::baseline::workflow::graph::Scheduler;
use crate::baseline::workflow::loader::WorkflowLoader;
use crate::baseline::workflow::plan::ExecutionPlan;
use crate::baseline::workflow::registry::ProbeRegistry;
use crate::baseline::workflow::results::Summary;
use crate::baseline::workflow::types::Workflow;
use crate::baseline::workflow::validator;
use crate::sdk::clock::{Clock, SystemClock};
use crate::sdk::config::EngineConfig;
use crate::sdk::error::BaselineError;

/// Metadata of one run; the per-rule results live on the workflow
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RunReport {
    pub run_id: Uuid,
    pub workflow_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub summary: Summary,
}

impl RunReport {
    pub fn is_compliant(&self) -> bool {
        self.summary.is_compliant()
    }
}

/// High-level entry point for validating and running workflows
pub struct Engine {
    loader: WorkflowLoader,
    registry: ProbeRegistry,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(registry: ProbeRegistry) -> Self {
        Self {
            loader: WorkflowLoader::new(),
            registry,
            clock: Arc::new(SystemClock),
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn registry(&self) -> &ProbeRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Load a workflow document from a file
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Workflow, BaselineError> {
        self.loader.load_workflow(path)
    }

    /// Validate a workflow without running it
    pub fn validate(&self, workflow: &Workflow) -> Result<ExecutionPlan, BaselineError> {
        Ok(validator::validate(workflow)?)
    }

    /// Validate and run `workflow`, replacing its results.
    ///
    /// Nothing is probed unless the workflow validates and, when a host is
    /// configured, applies to that host. Results of an earlier run are
    /// cleared first, so a rejected run leaves none behind.
    pub async fn run(&self, workflow: &mut Workflow) -> Result<RunReport, BaselineError> {
        workflow.replace_results(Vec::new());
        self.config.validate()?;
        let plan = self.validate(workflow)?;
        self.check_applicability(workflow)?;

        let started_at = self.clock.now();
        let run_id = Uuid::new_v4();
        log::info!(
            "Run {} of workflow '{}' started with {} rules",
            run_id,
            plan.workflow_name,
            plan.len()
        );

        let scheduler = Scheduler::new(self.registry.snapshot().await, Arc::clone(&self.clock))
            .with_max_concurrency(self.config.max_concurrency)
            .with_default_timeout(self.config.default_timeout);
        let results = scheduler.execute(&plan).await?;

        let summary = Summary::from_results(&results);
        workflow.replace_results(results);

        let finished_at = self.clock.now();
        log::info!(
            "Run {} finished: {} passed, {} failed, {} skipped",
            run_id,
            summary.passed,
            summary.failures(),
            summary.skipped
        );

        Ok(RunReport {
            run_id,
            workflow_name: plan.workflow_name,
            started_at,
            finished_at,
            summary,
        })
    }

    fn check_applicability(&self, workflow: &Workflow) -> Result<(), BaselineError> {
        let Some(host) = &self.config.host else {
            return Ok(());
        };
        workflow.applicability.check(host).map_err(|reason| {
            log::warn!(
                "Workflow '{}' does not apply to this host: {}",
                workflow.workflow_name,
                reason
            );
            BaselineError::not_applicable(&workflow.workflow_name, reason)
        })
    }
}
