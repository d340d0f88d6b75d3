// ABOUTME: Command implementations for the autotrack CLI
// ABOUTME: Handles the run, validate, graph and init commands

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::config::Config;
use crate::engine::{BuiltWorkflow, GraphBuilder, WorkflowEngine};
use crate::output::{self, OutputFormat, OutputTarget};
use crate::parser::{Workflow, WorkflowParser};
use crate::tasks::declarations_for;
use crate::tracking::Correlation;

async fn load_workflow(workflow_path: &Path) -> Result<Workflow> {
    WorkflowParser::new()
        .parse_file(workflow_path)
        .await
        .with_context(|| format!("Failed to parse workflow {}", workflow_path.display()))
}

fn build_graph(workflow: &Workflow, config: &Config) -> Result<BuiltWorkflow> {
    let declarations = declarations_for(workflow, &config.task_defaults())?;
    GraphBuilder::build(declarations)
        .with_context(|| format!("Invalid task graph in workflow '{}'", workflow.name))
}

/// Execute a workflow and emit its record. Fails when any task failed.
pub async fn run_workflow(
    workflow_path: PathBuf,
    correlation: Correlation,
    output: Option<PathBuf>,
    format: Option<OutputFormat>,
    config: &Config,
) -> Result<()> {
    info!("Starting workflow execution: {}", workflow_path.display());

    let workflow = load_workflow(&workflow_path).await?;
    info!("Loaded workflow: {} ({} tasks)", workflow.name, workflow.tasks.len());

    let declarations = declarations_for(&workflow, &config.task_defaults())?;
    let engine = WorkflowEngine::new();
    let (id, outcome) = engine
        .execute(declarations, correlation)
        .await
        .with_context(|| format!("Invalid task graph in workflow '{}'", workflow.name))?;

    let record = engine
        .registry()
        .record(&id)
        .ok_or_else(|| anyhow!("Workflow record {} missing from registry", id))?;

    let format = format.unwrap_or(config.output.format);
    let target = OutputTarget::from_option(output.as_deref());
    output::output_record(&record, format, &target).await?;

    match outcome.error {
        None => {
            info!("Workflow '{}' completed", workflow.name);
            Ok(())
        }
        Some(failure) => {
            let skipped = record.summary().not_run;
            if skipped > 0 {
                warn!("{} tasks were not run", skipped);
            }
            Err(anyhow!("Workflow '{}' failed: {}", workflow.name, failure))
        }
    }
}

/// Validate a workflow file without running anything
pub async fn validate_workflow(workflow_path: PathBuf, config: &Config) -> Result<()> {
    info!("Validating workflow: {}", workflow_path.display());

    let workflow = load_workflow(&workflow_path).await?;
    let built = build_graph(&workflow, config)?;

    let levels = built.tasks.execution_levels();
    info!(
        "Workflow '{}' has {} levels, max parallelism {}",
        workflow.name,
        levels.len(),
        built.tasks.max_parallelism()
    );

    println!("✓ Workflow '{}' is valid", workflow.name);
    println!("  Tasks: {}", built.tasks.len());
    println!("  Depth: {}", levels.len());
    println!("  Max parallelism: {}", built.tasks.max_parallelism());
    println!("  Final tasks: {}", built.tasks.leaf_tasks().join(", "));

    Ok(())
}

/// Emit the dependency graph of a workflow
pub async fn graph_workflow(
    workflow_path: PathBuf,
    output: Option<PathBuf>,
    format: OutputFormat,
    config: &Config,
) -> Result<()> {
    let workflow = load_workflow(&workflow_path).await?;
    let built = build_graph(&workflow, config)?;

    let target = OutputTarget::from_option(output.as_deref());
    output::output_graph(&built.graph, format, &target).await?;

    Ok(())
}

/// Initialize a new workflow file
pub async fn init_workflow(name: String, output_dir: PathBuf) -> Result<PathBuf> {
    info!("Initializing workflow '{}' in {}", name, output_dir.display());

    tokio::fs::create_dir_all(&output_dir).await?;

    let workflow_file = output_dir.join(format!("{}.yaml", name));
    if workflow_file.exists() {
        return Err(anyhow!(
            "Workflow file already exists: {}",
            workflow_file.display()
        ));
    }

    tokio::fs::write(&workflow_file, generate_workflow_template(&name)).await?;
    info!("Created workflow file: {}", workflow_file.display());

    Ok(workflow_file)
}

fn generate_workflow_template(name: &str) -> String {
    format!(
        r#"name: {}
description: Sample workflow; each task sees its dependencies as environment variables

tasks:
  task1:
    script: "echo 1"

  task2:
    depends_on: [task1]
    script: 'echo $(( AUTOTRACK_DEP_TASK1 + 1 ))'

  task3:
    signature: "|task1, task2|"
    script: 'echo $(( AUTOTRACK_DEP_TASK1 + AUTOTRACK_DEP_TASK2 ))'
"#,
        name
    )
}
