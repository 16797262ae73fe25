// SPDX-License-Identifier: MIT

use anyhow::Context;
use baseline_rs::baseline::probes::FixtureProbe;
use baseline_rs::baseline::workflow::engine::Engine;
use baseline_rs::baseline::workflow::loader::WorkflowLoader;
use baseline_rs::baseline::workflow::plan::Stage;
use baseline_rs::baseline::workflow::registry::ProbeRegistry;
use baseline_rs::sdk::config::EngineConfig;
use baseline_rs::sdk::error::BaselineError;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

const EXIT_NON_COMPLIANT: u8 = 1;
const EXIT_INVALID: u8 = 2;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a workflow document and report every error
    Validate {
        /// Path to the workflow file (.json, .yaml, .yml)
        file: PathBuf,
    },
    /// Show the dispatch stages of a workflow without running it
    Plan {
        /// Path to the workflow file
        file: PathBuf,
    },
    /// Run a workflow against canned probe answers
    Run {
        /// Path to the workflow file
        file: PathBuf,

        /// Fixture file mapping rule names to observed values
        #[arg(short, long)]
        fixtures: PathBuf,

        /// Print the workflow with its results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the JSON Schema of workflow documents
    Schema,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let vars: HashMap<String, String> = std::env::vars().collect();
    let config = engine_config(&args.command, &vars)?;
    let loader = WorkflowLoader::new();

    match args.command {
        Commands::Validate { file } => {
            let workflow = loader
                .load_workflow(&file)
                .with_context(|| format!("Failed to load {}", file.display()))?;
            match Engine::new(ProbeRegistry::new()).validate(&workflow) {
                Ok(plan) => {
                    println!(
                        "Workflow '{}' is valid ({} rules)",
                        plan.workflow_name,
                        plan.len()
                    );
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => Ok(report_invalid(e)),
            }
        }
        Commands::Plan { file } => {
            let workflow = loader
                .load_workflow(&file)
                .with_context(|| format!("Failed to load {}", file.display()))?;
            let plan = match Engine::new(ProbeRegistry::new()).validate(&workflow) {
                Ok(plan) => plan,
                Err(e) => return Ok(report_invalid(e)),
            };

            println!("Workflow '{}':", plan.workflow_name);
            for (i, stage) in plan.stages().iter().enumerate() {
                match stage {
                    Stage::Concurrent(rules) => {
                        println!("  {}. concurrent: {}", i + 1, rules.join(", "))
                    }
                    Stage::Exclusive(rule) => println!("  {}. exclusive:  {}", i + 1, rule),
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run {
            file,
            fixtures,
            json,
        } => {
            let mut workflow = loader
                .load_workflow(&file)
                .with_context(|| format!("Failed to load {}", file.display()))?;
            let probe = FixtureProbe::from_file(&fixtures)
                .with_context(|| format!("Failed to load fixtures {}", fixtures.display()))?;

            let registry = ProbeRegistry::new();
            registry.register_all(Arc::new(probe)).await;
            let engine = Engine::new(registry).with_config(config.unwrap_or_default());

            let report = match engine.run(&mut workflow).await {
                Ok(report) => report,
                Err(e @ BaselineError::Validation(_)) => return Ok(report_invalid(e)),
                Err(e) => return Err(e.into()),
            };

            if json {
                println!("{}", WorkflowLoader::to_json(&workflow)?);
            } else {
                for result in workflow.results() {
                    println!(
                        "[{:?}] {} (severity {}): {}",
                        result.status, result.rule_name, result.severity_score, result.message
                    );
                }
                let summary = &report.summary;
                println!(
                    "\n{} rules: {} passed, {} failed, {} skipped",
                    summary.total,
                    summary.passed,
                    summary.failures(),
                    summary.skipped
                );
                if let Some(severity) = summary.highest_failure_severity {
                    println!("Highest failure severity: {}", severity);
                }
            }

            if report.is_compliant() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(EXIT_NON_COMPLIANT))
            }
        }
        Commands::Schema => {
            println!(
                "{}",
                serde_json::to_string_pretty(&WorkflowLoader::schema())?
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Only `run` reads `BASELINE_*` settings; the other commands ignore them
fn engine_config(
    command: &Commands,
    vars: &HashMap<String, String>,
) -> Result<Option<EngineConfig>, BaselineError> {
    match command {
        Commands::Run { .. } => {
            let config = EngineConfig::from_vars(vars)?;
            log::debug!("Engine configuration: {:?}", config);
            Ok(Some(config))
        }
        _ => Ok(None),
    }
}

fn report_invalid(error: BaselineError) -> ExitCode {
    eprintln!("{}", error);
    ExitCode::from(EXIT_INVALID)
}
