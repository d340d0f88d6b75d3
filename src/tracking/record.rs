// ABOUTME: Per-run workflow record kept by the registry
// ABOUTME: Holds the graph with live statuses plus inputs, results, errors and timestamps

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

use crate::engine::{DependencyGraph, NodeStatus};

/// Caller-supplied values that tie a run back to whatever triggered it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correlation {
    pub request_id: Option<String>,
    pub context: Option<String>,
}

impl Correlation {
    pub fn new(request_id: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            request_id: Some(request_id.into()),
            context: Some(context.into()),
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// Everything observed about one run.
///
/// Errors are stored as their message only. Maps keep the order in which
/// events arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub id: Uuid,
    pub request_id: Option<String>,
    pub context: Option<String>,
    pub time: DateTime<Utc>,
    pub graph: Option<DependencyGraph>,
    #[serde(default)]
    pub inputs: IndexMap<String, Vec<Value>>,
    #[serde(default)]
    pub results: IndexMap<String, Value>,
    #[serde(default)]
    pub errors: IndexMap<String, String>,
    #[serde(default)]
    pub start_time: IndexMap<String, DateTime<Utc>>,
    #[serde(default)]
    pub end_time: IndexMap<String, DateTime<Utc>>,
}

impl WorkflowRecord {
    pub fn new(id: Uuid, correlation: Correlation) -> Self {
        Self {
            id,
            request_id: correlation.request_id,
            context: correlation.context,
            time: Utc::now(),
            graph: None,
            inputs: IndexMap::new(),
            results: IndexMap::new(),
            errors: IndexMap::new(),
            start_time: IndexMap::new(),
            end_time: IndexMap::new(),
        }
    }

    /// Relabel a graph node. Does nothing before the graph is set or when
    /// the task is not part of it.
    pub fn mark_status(&mut self, task: &str, status: NodeStatus) -> bool {
        match self.graph.as_mut() {
            Some(graph) => graph.set_status(task, status),
            None => false,
        }
    }

    pub fn status(&self, task: &str) -> Option<NodeStatus> {
        self.graph.as_ref().and_then(|graph| graph.status(task))
    }

    /// Wall time between a task's start and end stamps.
    pub fn task_duration(&self, task: &str) -> Option<Duration> {
        let start = self.start_time.get(task)?;
        let end = self.end_time.get(task)?;
        (*end - *start).to_std().ok()
    }

    pub fn is_failed(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        let Some(graph) = &self.graph else {
            return summary;
        };

        for node in &graph.nodes {
            summary.total += 1;
            match node.status {
                NodeStatus::Return => summary.returned += 1,
                NodeStatus::Error => summary.errored += 1,
                NodeStatus::Start => summary.running += 1,
                NodeStatus::NotRun => summary.not_run += 1,
            }
        }

        summary
    }
}

/// Node counts by status, derived from a record's graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub returned: usize,
    pub errored: usize,
    pub running: usize,
    pub not_run: usize,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.errored == 0 && self.returned == self.total
    }
}
