// ABOUTME: Lifecycle tracking hooks and the workflow registry
// ABOUTME: Observers receive graph, start, return and error events for one run

pub mod record;
pub mod registry;

use serde_json::Value;

use crate::engine::{DependencyGraph, TaskError};

pub use record::{Correlation, RunSummary, WorkflowRecord};
pub use registry::{RecordTracker, WorkflowRegistry};

/// Observer attached to a single run.
///
/// Every hook defaults to a no-op. Hooks are side effects only: nothing they
/// do can change which tasks run or what the completion callback receives.
pub trait Tracker: Send + Sync {
    /// Receives the run's graph once, before any task starts.
    fn set_graph(&self, _graph: DependencyGraph) {}

    fn report_start(&self, _task: &str, _inputs: &[Value]) {}

    fn report_return(&self, _task: &str, _result: &Value) {}

    fn report_error(&self, _task: &str, _error: &TaskError) {}
}

/// Tracker that observes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracker;

impl Tracker for NoopTracker {}

impl<T: Tracker + ?Sized> Tracker for std::sync::Arc<T> {
    fn set_graph(&self, graph: DependencyGraph) {
        (**self).set_graph(graph)
    }

    fn report_start(&self, task: &str, inputs: &[Value]) {
        (**self).report_start(task, inputs)
    }

    fn report_return(&self, task: &str, result: &Value) {
        (**self).report_return(task, result)
    }

    fn report_error(&self, task: &str, error: &TaskError) {
        (**self).report_error(task, error)
    }
}
