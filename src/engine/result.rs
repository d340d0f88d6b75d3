// ABOUTME: Node status labels and the aggregated outcome of a run
// ABOUTME: Defines what the completion callback receives and how graph nodes are labelled

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::TaskFailure;

/// Lifecycle label of a graph node.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    #[default]
    NotRun,
    Start,
    Return,
    Error,
}

impl NodeStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, NodeStatus::Return | NodeStatus::Error)
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeStatus::NotRun => write!(f, "not run"),
            NodeStatus::Start => write!(f, "start"),
            NodeStatus::Return => write!(f, "return"),
            NodeStatus::Error => write!(f, "error"),
        }
    }
}

/// Aggregate result of one run: the first failure, if any, and every value
/// recorded before the run settled.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub error: Option<TaskFailure>,
    pub results: IndexMap<String, Value>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn get(&self, task: &str) -> Option<&Value> {
        self.results.get(task)
    }

    pub fn into_result(self) -> Result<IndexMap<String, Value>, TaskFailure> {
        match self.error {
            Some(failure) => Err(failure),
            None => Ok(self.results),
        }
    }
}
