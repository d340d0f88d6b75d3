// ABOUTME: Per-run execution state owned by the task executor
// ABOUTME: Tracks recorded results, not-yet-started tasks and the first failure

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

use super::dependency::TaskSet;
use super::error::{TaskError, TaskFailure};
use super::result::RunOutcome;
use super::task::TaskSpec;

#[derive(Debug)]
pub(crate) struct ExecutionState {
    results: IndexMap<String, Value>,
    pending: IndexSet<String>,
    errored: Option<TaskFailure>,
}

impl ExecutionState {
    pub(crate) fn new(tasks: &TaskSet) -> Self {
        Self {
            results: IndexMap::with_capacity(tasks.len()),
            pending: tasks.names().map(str::to_string).collect(),
            errored: None,
        }
    }

    /// Remove and return every pending task whose dependencies all have
    /// results, in declaration order. Nothing becomes eligible once a failure
    /// has been recorded.
    pub(crate) fn take_eligible(&mut self, tasks: &TaskSet) -> Vec<String> {
        if self.errored.is_some() {
            return Vec::new();
        }

        let results = &self.results;
        let eligible: Vec<String> = self
            .pending
            .iter()
            .filter(|name| {
                tasks.get(name).is_some_and(|spec| {
                    spec.dependencies
                        .iter()
                        .all(|dependency| results.contains_key(dependency))
                })
            })
            .cloned()
            .collect();

        for name in &eligible {
            self.pending.shift_remove(name);
        }

        eligible
    }

    /// Dependency values in the order the task declared them.
    pub(crate) fn inputs_for(&self, spec: &TaskSpec) -> Vec<Value> {
        spec.dependencies
            .iter()
            .map(|dependency| self.results.get(dependency).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Returns false if the task already had a result; the first value wins.
    pub(crate) fn record_result(&mut self, task: String, value: Value) -> bool {
        if self.results.contains_key(&task) {
            return false;
        }
        self.results.insert(task, value);
        true
    }

    /// Returns true if this became the run's error.
    pub(crate) fn record_error(&mut self, task: String, error: TaskError) -> bool {
        if self.errored.is_some() {
            return false;
        }
        self.errored = Some(TaskFailure { task, error });
        true
    }

    pub(crate) fn has_failed(&self) -> bool {
        self.errored.is_some()
    }

    pub(crate) fn pending(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(String::as_str)
    }

    pub(crate) fn completed(&self) -> usize {
        self.results.len()
    }

    pub(crate) fn into_outcome(self) -> RunOutcome {
        RunOutcome {
            error: self.errored,
            results: self.results,
        }
    }
}
