// ABOUTME: Error types for graph construction and task execution
// ABOUTME: Separates declaration errors raised before a run from failures raised by task runners

use thiserror::Error;

use super::inspector::SignatureError;

#[derive(Error, Debug, Clone)]
pub enum ExecutionError {
    #[error("Could not infer dependencies of task '{task}': {source}")]
    SignatureParse {
        task: String,
        #[source]
        source: SignatureError,
    },

    #[error("Task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency { task: String, dependency: String },

    #[error("Circular dependency detected: {tasks:?}")]
    CircularDependency { tasks: Vec<String> },

    #[error("Duplicate task name: {task}")]
    DuplicateTask { task: String },

    #[error("Invalid task name: '{name}'")]
    InvalidTaskName { name: String },
}

pub type Result<T> = std::result::Result<T, ExecutionError>;

/// Failure signalled by a task runner.
///
/// Only the human-readable message travels with the error; trackers store
/// exactly this message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TaskError {
    message: String,
}

impl TaskError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<anyhow::Error> for TaskError {
    fn from(error: anyhow::Error) -> Self {
        Self::new(format!("{:#}", error))
    }
}

impl From<std::io::Error> for TaskError {
    fn from(error: std::io::Error) -> Self {
        Self::new(error.to_string())
    }
}

impl From<serde_json::Error> for TaskError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(error.to_string())
    }
}

/// The first task failure of a run, as delivered to the completion callback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Task '{task}' failed: {error}")]
pub struct TaskFailure {
    pub task: String,
    #[source]
    pub error: TaskError,
}
