// ABOUTME: Parser module for YAML workflow definitions
// ABOUTME: Exports workflow loading and task configuration types

pub mod error;
pub mod task;
pub mod workflow;

pub use error::ParserError;
pub use task::{TaskAction, TaskConfig};
pub use workflow::{Workflow, WorkflowParser};
