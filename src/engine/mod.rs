// ABOUTME: Dependency-tracked execution engine for autotrack
// ABOUTME: Infers task dependencies, validates the graph and runs tasks as inputs resolve

pub mod dependency;
pub mod error;
pub mod executor;
pub mod inspector;
pub mod result;
mod state;
pub mod task;

pub use dependency::{
    BuiltWorkflow, DependencyGraph, GraphBuilder, GraphEdge, GraphNode, TaskSet,
};
pub use error::{ExecutionError, Result, TaskError, TaskFailure};
pub use executor::{auto_track, TaskExecutor, WorkflowEngine};
pub use inspector::{parse_dependencies, InterfaceStyle, SignatureError};
pub use result::{NodeStatus, RunOutcome};
pub use task::{
    callback_fn, task_fn, CallbackRunner, Completion, FnRunner, TaskDeclaration, TaskRunner,
    TaskSpec,
};
