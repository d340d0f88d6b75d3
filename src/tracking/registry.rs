// ABOUTME: Process-wide registry of workflow records
// ABOUTME: Hands out record-backed trackers and exposes snapshots of every run

use chrono::Utc;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::record::{Correlation, WorkflowRecord};
use super::Tracker;
use crate::engine::{DependencyGraph, NodeStatus, TaskError};

type SharedRecord = Arc<RwLock<WorkflowRecord>>;

/// Tracker that writes every event into one registered record.
#[derive(Debug, Clone)]
pub struct RecordTracker {
    id: Uuid,
    record: SharedRecord,
}

impl RecordTracker {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Copy of the record as it stands now.
    pub fn snapshot(&self) -> WorkflowRecord {
        self.record.read().clone()
    }
}

impl Tracker for RecordTracker {
    fn set_graph(&self, graph: DependencyGraph) {
        self.record.write().graph = Some(graph);
    }

    fn report_start(&self, task: &str, inputs: &[Value]) {
        let mut record = self.record.write();
        record.mark_status(task, NodeStatus::Start);
        record.inputs.insert(task.to_string(), inputs.to_vec());
        record.start_time.insert(task.to_string(), Utc::now());
    }

    fn report_return(&self, task: &str, result: &Value) {
        let mut record = self.record.write();
        record.mark_status(task, NodeStatus::Return);
        record.results.insert(task.to_string(), result.clone());
        record.end_time.insert(task.to_string(), Utc::now());
    }

    fn report_error(&self, task: &str, error: &TaskError) {
        let mut record = self.record.write();
        record.mark_status(task, NodeStatus::Error);
        record
            .errors
            .insert(task.to_string(), error.message().to_string());
        record.end_time.insert(task.to_string(), Utc::now());
    }
}

/// Records for every run created through it, in creation order.
///
/// Records are never removed. Cloning shares the same storage.
#[derive(Debug, Clone, Default)]
pub struct WorkflowRegistry {
    records: Arc<RwLock<IndexMap<Uuid, SharedRecord>>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty record and return a tracker bound to it.
    pub fn new_run(&self, correlation: Correlation) -> (Uuid, RecordTracker) {
        let id = Uuid::new_v4();
        let record = Arc::new(RwLock::new(WorkflowRecord::new(id, correlation)));
        self.records.write().insert(id, Arc::clone(&record));
        debug!("Created workflow record {}", id);

        (id, RecordTracker { id, record })
    }

    pub fn record(&self, id: &Uuid) -> Option<WorkflowRecord> {
        self.records
            .read()
            .get(id)
            .map(|record| record.read().clone())
    }

    /// Snapshot of every record, oldest first.
    pub fn all_records(&self) -> IndexMap<Uuid, WorkflowRecord> {
        self.records
            .read()
            .iter()
            .map(|(id, record)| (*id, record.read().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}
