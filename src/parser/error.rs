// ABOUTME: Error types for workflow file loading
// ABOUTME: Covers I/O, YAML syntax, structural problems and bad signatures in task definitions

use thiserror::Error;

use crate::engine::ExecutionError;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Failed to read workflow file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Empty workflow: no tasks defined")]
    EmptyWorkflow,

    #[error("Invalid task configuration for '{task}': {reason}")]
    InvalidTask { task: String, reason: String },

    #[error(transparent)]
    Declaration(#[from] ExecutionError),
}

pub type Result<T> = std::result::Result<T, ParserError>;
