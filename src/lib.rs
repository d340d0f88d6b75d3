// ABOUTME: Main library module for the autotrack task orchestrator
// ABOUTME: Exports the engine, tracking, workflow files and CLI building blocks

pub mod cli;
pub mod engine;
pub mod output;
pub mod parser;
pub mod tasks;
pub mod tracking;

// Re-export commonly used types
pub use engine::{
    auto_track, callback_fn, task_fn, Completion, DependencyGraph, ExecutionError, GraphBuilder,
    NodeStatus, RunOutcome, TaskDeclaration, TaskError, TaskExecutor, TaskFailure, TaskRunner,
    WorkflowEngine,
};
pub use parser::{Workflow, WorkflowParser};
pub use tracking::{Correlation, NoopTracker, RecordTracker, Tracker, WorkflowRecord, WorkflowRegistry};

pub type Result<T> = anyhow::Result<T>;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
