//! Integration tests for workflow validation and execution
//!
//! These tests verify end-to-end workflow behavior using mock probes.

use async_trait::async_trait;
use baseline_rs::baseline::probes::FixtureProbe;
use baseline_rs::baseline::workflow::engine::Engine;
use baseline_rs::baseline::workflow::loader::WorkflowLoader;
use baseline_rs::baseline::workflow::registry::ProbeRegistry;
use baseline_rs::baseline::workflow::results::RuleStatus;
use baseline_rs::baseline::workflow::types::{Condition, Rule, Workflow};
use baseline_rs::baseline::workflow::validator::validate;
use baseline_rs::sdk::clock::FixedClock;
use baseline_rs::sdk::error::{BaselineError, ProbeError, ValidationError};
use baseline_rs::sdk::probe::{Observation, Probe, ProbeRequest};
use baseline_rs::sdk::provider::{ProviderParameters, ProviderType, ServiceParameters};
use baseline_rs::sdk::timeout::Timeout;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Mock Components
// ============================================================================

/// Mock probe that answers by rule name and records every call
struct MockProbe {
    answers: HashMap<String, Observation>,
    delay: Duration,
    calls: Mutex<Vec<String>>,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl MockProbe {
    fn new(answers: &[(&str, Value)]) -> Self {
        Self {
            answers: answers
                .iter()
                .map(|(name, value)| (name.to_string(), Some(value.clone())))
                .collect(),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Probe for MockProbe {
    fn name(&self) -> &str {
        "mock"
    }

    async fn observe(&self, request: ProbeRequest) -> Result<Observation, ProbeError> {
        self.calls.lock().unwrap().push(request.rule_name.clone());
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::select! {
            _ = tokio::time::sleep(self.delay) => {}
            _ = request.cancellation.cancelled() => {
                self.running.fetch_sub(1, Ordering::SeqCst);
                return Err(ProbeError::Cancelled);
            }
        }

        self.running.fetch_sub(1, Ordering::SeqCst);
        Ok(self.answers.get(&request.rule_name).cloned().flatten())
    }
}

/// Probe that always panics
struct PanickingProbe;

#[async_trait]
impl Probe for PanickingProbe {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn observe(&self, _request: ProbeRequest) -> Result<Observation, ProbeError> {
        panic!("WMI provider crashed");
    }
}

async fn engine_with(probe: Arc<dyn Probe>) -> Engine {
    let registry = ProbeRegistry::new();
    registry.register_all(probe).await;
    Engine::new(registry)
}

fn service_rule(name: &str) -> Value {
    json!({
        "RuleName": name,
        "Provider": "Service",
        "Parameters": { "ServiceName": name },
        "Condition": { "Operator": "Equals", "Expected": "Running" },
        "Severity": 5
    })
}

fn workflow(value: Value) -> Workflow {
    serde_json::from_value(value).unwrap()
}

// ============================================================================
// Scenario Tests
// ============================================================================

#[tokio::test]
async fn test_single_service_rule_passes() {
    let probe = Arc::new(MockProbe::new(&[("SpoolerRunning", json!("Running"))]));
    let engine = engine_with(probe.clone()).await;

    let mut workflow = workflow(json!({
        "WorkflowName": "Print Server",
        "Rules": [{
            "RuleName": "SpoolerRunning",
            "Provider": "Service",
            "Parameters": { "ServiceName": "Spooler" },
            "Condition": { "Operator": "Equals", "Expected": "Running" }
        }]
    }));
    let report = engine.run(&mut workflow).await.unwrap();

    let result = workflow.result("SpoolerRunning").unwrap();
    assert!(result.success);
    assert_eq!(result.execution_mode.as_str(), "Independent");
    assert!(report.is_compliant());
    assert_eq!(probe.call_count(), 1);
}

#[tokio::test]
async fn test_stop_on_failure_never_starts_dependent() {
    let probe = Arc::new(MockProbe::new(&[
        ("RuleA", json!("Stopped")),
        ("RuleB", json!("Running")),
    ]));
    let engine = engine_with(probe.clone()).await;

    let mut rule_b = service_rule("RuleB");
    rule_b["Execution"] = json!({ "DependsOn": ["RuleA"] });
    let mut workflow = workflow(json!({
        "WorkflowName": "W",
        "Constraints": { "StopOnFailure": true },
        "Rules": [service_rule("RuleA"), rule_b]
    }));
    let report = engine.run(&mut workflow).await.unwrap();

    assert_eq!(probe.calls(), vec!["RuleA"]);
    let results = workflow.results();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].status, RuleStatus::Failed);
    assert_eq!(results[1].status, RuleStatus::Skipped);
    assert!(!results[1].success);
    assert_eq!(report.summary.skipped, 1);
    assert_eq!(report.summary.highest_failure_severity, Some(5));
}

#[tokio::test]
async fn test_type_mismatch_is_an_evaluation_error() {
    let probe = Arc::new(MockProbe::new(&[
        ("Threshold", json!("abc")),
        ("Sibling", json!("Running")),
    ]));
    let engine = engine_with(probe).await;

    let mut workflow = workflow(json!({
        "WorkflowName": "W",
        "Rules": [
            {
                "RuleName": "Threshold",
                "Provider": "Process",
                "Parameters": { "ProcessName": "svchost" },
                "Condition": { "Operator": "GreaterThan", "Expected": 5 }
            },
            service_rule("Sibling")
        ]
    }));
    engine.run(&mut workflow).await.unwrap();

    let threshold = workflow.result("Threshold").unwrap();
    assert!(!threshold.success);
    assert_eq!(threshold.status, RuleStatus::EvaluationError);
    assert!(threshold.message.contains("type mismatch"));

    // No abort: the sibling still ran
    assert!(workflow.result("Sibling").unwrap().success);
}

#[tokio::test]
async fn test_cycle_fails_validation_without_probing() {
    let probe = Arc::new(MockProbe::new(&[]));
    let engine = engine_with(probe.clone()).await;

    let mut rule_a = service_rule("RuleA");
    rule_a["Execution"] = json!({ "DependsOn": ["RuleB"] });
    let mut rule_b = service_rule("RuleB");
    rule_b["Execution"] = json!({ "DependsOn": ["RuleA"] });
    let mut workflow = workflow(json!({ "WorkflowName": "W", "Rules": [rule_a, rule_b] }));

    let err = engine.run(&mut workflow).await.unwrap_err();
    let BaselineError::Validation(report) = err else {
        panic!("Expected a validation error");
    };
    let cycles: Vec<_> = report.cycles().collect();
    assert_eq!(cycles.len(), 1);
    assert!(cycles[0].involves("RuleA") && cycles[0].involves("RuleB"));
    assert_eq!(probe.call_count(), 0);
    assert!(workflow.results().is_empty());
}

// ============================================================================
// Property Tests
// ============================================================================

#[tokio::test]
async fn test_unknown_dependency_fails_before_any_probe() {
    let probe = Arc::new(MockProbe::new(&[]));
    let engine = engine_with(probe.clone()).await;

    let mut rule = service_rule("A");
    rule["Execution"] = json!({ "DependsOn": ["DoesNotExist"] });
    let mut workflow = workflow(json!({
        "WorkflowName": "W",
        "Rules": [service_rule("Other"), rule]
    }));

    let err = engine.run(&mut workflow).await.unwrap_err();
    assert!(err
        .validation_errors()
        .iter()
        .any(|e| matches!(e, ValidationError::UnknownDependency { .. })));
    assert_eq!(probe.call_count(), 0);
}

#[tokio::test]
async fn test_exists_ignores_expected() {
    let probe = Arc::new(MockProbe::new(&[("Present", json!(0))]));
    let engine = engine_with(probe).await;

    let mut workflow = workflow(json!({
        "WorkflowName": "W",
        "Rules": [
            {
                "RuleName": "Present",
                "Provider": "Registry",
                "Parameters": { "Hive": "HKLM", "Path": "SOFTWARE\\X", "Key": "Y" },
                "Condition": { "Operator": "Exists", "Expected": "anything" }
            },
            {
                "RuleName": "Absent",
                "Provider": "Registry",
                "Parameters": { "Hive": "HKLM", "Path": "SOFTWARE\\X", "Key": "Z" },
                "Condition": { "Operator": "Exists", "Expected": 0 }
            }
        ]
    }));
    engine.run(&mut workflow).await.unwrap();

    assert!(workflow.result("Present").unwrap().success);
    assert!(!workflow.result("Absent").unwrap().success);
}

#[tokio::test]
async fn test_reordering_keeps_outcomes_and_follows_declaration_order() {
    let answers = [
        ("A", json!("Running")),
        ("B", json!("Stopped")),
        ("C", json!("Running")),
    ];

    let mut c = service_rule("C");
    c["Execution"] = json!({ "DependsOn": ["A"] });

    let mut forward = workflow(json!({
        "WorkflowName": "W",
        "Rules": [service_rule("A"), service_rule("B"), c.clone()]
    }));
    let mut reversed = workflow(json!({
        "WorkflowName": "W",
        "Rules": [c, service_rule("B"), service_rule("A")]
    }));

    engine_with(Arc::new(MockProbe::new(&answers)))
        .await
        .run(&mut forward)
        .await
        .unwrap();
    engine_with(Arc::new(MockProbe::new(&answers)))
        .await
        .run(&mut reversed)
        .await
        .unwrap();

    let names = |w: &Workflow| -> Vec<String> {
        w.results().iter().map(|r| r.rule_name.clone()).collect()
    };
    assert_eq!(names(&forward), vec!["A", "B", "C"]);
    assert_eq!(names(&reversed), vec!["C", "B", "A"]);

    for name in ["A", "B", "C"] {
        assert_eq!(
            forward.result(name).unwrap().success,
            reversed.result(name).unwrap().success
        );
    }
}

#[test]
fn test_round_trip_validates_identically() {
    let original = workflow(json!({
        "$schema": "https://example.com/compliance-workflow.json",
        "WorkflowName": "Round Trip",
        "Constraints": { "RunSequentially": true, "Timeout": "90s" },
        "Rules": [
            {
                "RuleName": "Acl",
                "Provider": "ACL",
                "Parameters": { "Path": "C:\\Windows", "Identity": "Users", "Rights": ["Read"] },
                "Condition": { "Operator": "Contains", "Expected": "Read" },
                "Tags": ["fs"]
            },
            {
                "RuleName": "Pattern",
                "Provider": "WMI",
                "Parameters": { "Class": "Win32_OperatingSystem", "Property": "Caption" },
                "Condition": { "Operator": "RegexMatch", "Expected": "Microsoft Windows.*" },
                "Execution": { "DependsOn": ["Acl"], "Timeout": "250ms" }
            },
            {
                "RuleName": "Custom",
                "Provider": "Custom",
                "Parameters": { "Values": { "script": "tpm", "nested": { "depth": [1, null, true] } } },
                "Condition": { "Operator": "NotEquals", "Expected": null }
            }
        ]
    }));

    let json_text = WorkflowLoader::to_json(&original).unwrap();
    let from_json = WorkflowLoader::parse_json(&json_text).unwrap();
    let yaml_text = WorkflowLoader::to_yaml(&original).unwrap();
    let from_yaml = WorkflowLoader::parse_yaml(&yaml_text).unwrap();

    assert_eq!(from_json.rules, original.rules);
    assert_eq!(from_yaml.rules, original.rules);

    let plan = validate(&original).unwrap();
    let reparsed = validate(&from_json).unwrap();
    for (a, b) in plan.rules.iter().zip(reparsed.rules.iter()) {
        assert_eq!(a.parameters, b.parameters);
        assert_eq!(a.timeout, b.timeout);
        assert_eq!(a.run_mode, b.run_mode);
    }
    assert_eq!(plan.stages(), reparsed.stages());
}

#[test]
fn test_all_validation_errors_reported_together() {
    let report = validate(&workflow(json!({
        "Rules": [
            {
                "RuleName": "Dup",
                "Provider": "Service",
                "Parameters": { "ServiceName": "A" },
                "Condition": { "Operator": "Equals" },
                "Severity": -1
            },
            {
                "RuleName": "Dup",
                "Provider": "FileSystem",
                "Parameters": { "ServiceName": "A" },
                "Condition": { "Operator": "RegexMatch", "Expected": "([" }
            }
        ]
    })))
    .unwrap_err();

    let errors = report.errors();
    assert!(errors.contains(&ValidationError::missing("WorkflowName")));
    assert!(errors
        .iter()
        .any(|e| matches!(e, ValidationError::SeverityOutOfRange { value: -1, .. })));
    assert!(errors
        .iter()
        .any(|e| matches!(e, ValidationError::MissingExpected { .. })));
    assert!(errors
        .iter()
        .any(|e| matches!(e, ValidationError::InvalidExpected { .. })));
    let filesystem_parameter = |e: &ValidationError| {
        matches!(e, ValidationError::Parameter(p) if p.provider == ProviderType::FileSystem)
    };
    assert!(errors.iter().any(filesystem_parameter));
    assert!(errors
        .iter()
        .any(|e| matches!(e, ValidationError::DuplicateRuleName { first_index: 0, .. })));
    let message = report.to_string();
    assert!(message.starts_with("workflow validation failed with"));
}

// ============================================================================
// Execution Tests
// ============================================================================

#[tokio::test]
async fn test_run_sequentially_never_overlaps() {
    let probe = Arc::new(MockProbe::new(&[]).with_delay(Duration::from_millis(10)));
    let engine = engine_with(probe.clone()).await;

    let rules: Vec<Value> = (0..5).map(|i| service_rule(&format!("R{}", i))).collect();
    let mut workflow = workflow(json!({
        "WorkflowName": "W",
        "Constraints": { "RunSequentially": true },
        "Rules": rules
    }));
    engine.run(&mut workflow).await.unwrap();

    assert_eq!(probe.peak.load(Ordering::SeqCst), 1);
    assert_eq!(probe.calls(), vec!["R0", "R1", "R2", "R3", "R4"]);
    assert!(workflow
        .results()
        .iter()
        .all(|r| r.execution_mode.as_str() == "Sequential"));
}

#[tokio::test]
async fn test_independent_rules_run_concurrently() {
    let probe = Arc::new(MockProbe::new(&[]).with_delay(Duration::from_millis(50)));
    let engine = engine_with(probe.clone()).await;

    let rules: Vec<Value> = (0..4).map(|i| service_rule(&format!("R{}", i))).collect();
    let mut workflow = workflow(json!({ "WorkflowName": "W", "Rules": rules }));
    engine.run(&mut workflow).await.unwrap();

    assert!(probe.peak.load(Ordering::SeqCst) > 1);
}

#[tokio::test]
async fn test_timeout_cancels_probe() {
    let probe = Arc::new(
        MockProbe::new(&[("Slow", json!("Running"))]).with_delay(Duration::from_secs(5)),
    );
    let engine = engine_with(probe.clone()).await;

    let mut workflow = workflow(json!({
        "WorkflowName": "W",
        "Constraints": { "Timeout": "50ms" },
        "Rules": [service_rule("Slow")]
    }));
    let started = std::time::Instant::now();
    engine.run(&mut workflow).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    let result = workflow.result("Slow").unwrap();
    assert_eq!(result.status, RuleStatus::TimedOut);
    assert!(result.message.contains("timed out after 50ms"));
    assert!(result.status.is_infrastructure());
}

#[tokio::test]
async fn test_probe_panic_is_contained() {
    let engine = engine_with(Arc::new(PanickingProbe)).await;
    let mut workflow = workflow(json!({
        "WorkflowName": "W",
        "Rules": [service_rule("A"), service_rule("B")]
    }));

    let report = engine.run(&mut workflow).await.unwrap();

    assert_eq!(report.summary.probe_errors, 2);
    assert!(workflow
        .results()
        .iter()
        .all(|r| r.status == RuleStatus::ProbeError && r.message.contains("WMI provider crashed")));
}

#[tokio::test]
async fn test_unregistered_provider_is_a_probe_error() {
    let registry = ProbeRegistry::new();
    registry
        .register(ProviderType::Registry, Arc::new(MockProbe::new(&[])))
        .await;
    let engine = Engine::new(registry);

    let mut workflow = workflow(json!({ "WorkflowName": "W", "Rules": [service_rule("A")] }));
    engine.run(&mut workflow).await.unwrap();

    let result = workflow.result("A").unwrap();
    assert_eq!(result.status, RuleStatus::ProbeError);
    assert!(result.message.contains("no probe registered"));
}

#[tokio::test]
async fn test_fixture_probe_drives_a_built_workflow() {
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap());
    let spooler = Rule::new(
        "Spooler",
        ProviderParameters::Service(ServiceParameters {
            service_name: "Spooler".to_string(),
            expected_status: None,
        }),
        Condition::equals("Stopped"),
    )
    .with_severity(7)
    .with_message("Print spooler must be disabled")
    .with_timeout(Timeout::from_secs(10));

    let mut workflow = Workflow::new("Built", &clock).with_rule(spooler);

    let probe = FixtureProbe::new().with_error("Spooler", "service control manager unavailable");
    let engine = engine_with(Arc::new(probe))
        .await
        .with_clock(Arc::new(clock));
    let report = engine.run(&mut workflow).await.unwrap();

    let result = workflow.result("Spooler").unwrap();
    assert_eq!(result.status, RuleStatus::ProbeError);
    assert!(result
        .message
        .starts_with("Print spooler must be disabled: probe error:"));
    assert_eq!(result.severity_score, 7);
    assert_eq!(report.summary.highest_failure_severity, Some(7));
    assert!(!report.is_compliant());

    let serialized = serde_json::to_value(&workflow).unwrap();
    assert_eq!(serialized["Results"][0]["Status"], "ProbeError");
    assert_eq!(serialized["Results"][0]["SeverityScore"], 7);
}
