// ABOUTME: Task executor that runs a validated task set as dependencies resolve
// ABOUTME: Starts every eligible task at once, reports lifecycle events and aggregates results

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use indexmap::IndexMap;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::dependency::{GraphBuilder, TaskSet};
use super::error::{Result, TaskError, TaskFailure};
use super::result::RunOutcome;
use super::state::ExecutionState;
use super::task::TaskDeclaration;
use crate::tracking::{Correlation, Tracker, WorkflowRegistry};

type InFlight = BoxFuture<'static, (String, std::result::Result<Value, TaskError>)>;

#[derive(Debug, Clone, Copy, Default)]
pub struct TaskExecutor;

impl TaskExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Run every task and hand the outcome to `on_complete`, exactly once.
    pub async fn run<F>(&self, tasks: &TaskSet, tracker: &dyn Tracker, on_complete: F)
    where
        F: FnOnce(Option<TaskFailure>, IndexMap<String, Value>),
    {
        let outcome = self.execute(tasks, tracker).await;
        on_complete(outcome.error, outcome.results);
    }

    /// Run every task to completion.
    ///
    /// All eligible tasks are started together and driven from this single
    /// future, so results and tracker calls never race. After the first
    /// failure no new task starts; tasks already running finish and their
    /// values are still recorded.
    #[instrument(skip_all, fields(tasks = tasks.len()))]
    pub async fn execute(&self, tasks: &TaskSet, tracker: &dyn Tracker) -> RunOutcome {
        let start_time = Instant::now();
        let mut state = ExecutionState::new(tasks);
        let mut in_flight: FuturesUnordered<InFlight> = FuturesUnordered::new();

        info!("Starting run of {} tasks", tasks.len());

        loop {
            for name in state.take_eligible(tasks) {
                let Some(spec) = tasks.get(&name) else {
                    continue;
                };

                let inputs = state.inputs_for(spec);
                debug!("Starting task '{}' with {} inputs", name, inputs.len());
                tracker.report_start(&name, &inputs);

                let runner = Arc::clone(&spec.runner);
                in_flight.push(
                    async move {
                        let result = match AssertUnwindSafe(runner.run(inputs))
                            .catch_unwind()
                            .await
                        {
                            Ok(result) => result,
                            Err(payload) => Err(panic_error(payload)),
                        };
                        (name, result)
                    }
                    .boxed(),
                );
            }

            let Some((name, result)) = in_flight.next().await else {
                break;
            };

            match result {
                Ok(value) => {
                    debug!("Task '{}' returned", name);
                    tracker.report_return(&name, &value);
                    state.record_result(name, value);
                }
                Err(task_error) => {
                    error!("Task '{}' failed: {}", name, task_error);
                    tracker.report_error(&name, &task_error);
                    if !state.record_error(name, task_error) {
                        debug!("Run already failed, later error kept for tracking only");
                    }
                }
            }
        }

        if state.has_failed() {
            let skipped: Vec<&str> = state.pending().collect();
            if !skipped.is_empty() {
                warn!("Tasks not started after failure: {:?}", skipped);
            }
        }

        info!(
            "Run finished in {:?}: {}/{} tasks returned{}",
            start_time.elapsed(),
            state.completed(),
            tasks.len(),
            if state.has_failed() { ", failed" } else { "" }
        );

        state.into_outcome()
    }
}

fn panic_error(payload: Box<dyn Any + Send>) -> TaskError {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());

    TaskError::new(format!("task panicked: {}", detail))
}

/// Build the graph for `declarations`, publish it to `tracker`, then run.
///
/// Declaration errors are returned before any task starts, and `on_complete`
/// is not called for that run.
pub async fn auto_track<I, S, F>(
    declarations: I,
    on_complete: F,
    tracker: &dyn Tracker,
) -> Result<()>
where
    I: IntoIterator<Item = (S, TaskDeclaration)>,
    S: Into<String>,
    F: FnOnce(Option<TaskFailure>, IndexMap<String, Value>),
{
    let built = GraphBuilder::build(declarations)?;
    tracker.set_graph(built.graph);

    TaskExecutor::new()
        .run(&built.tasks, tracker, on_complete)
        .await;

    Ok(())
}

/// Runs declarations under freshly registered workflow records.
#[derive(Debug, Clone, Default)]
pub struct WorkflowEngine {
    registry: WorkflowRegistry,
    executor: TaskExecutor,
}

impl WorkflowEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: WorkflowRegistry) -> Self {
        Self {
            registry,
            executor: TaskExecutor::new(),
        }
    }

    pub fn registry(&self) -> &WorkflowRegistry {
        &self.registry
    }

    /// Validate declarations, then run them under a new record. Nothing is
    /// registered when the declarations are rejected.
    #[instrument(skip_all, fields(request_id = ?correlation.request_id))]
    pub async fn execute<I, S>(
        &self,
        declarations: I,
        correlation: Correlation,
    ) -> Result<(Uuid, RunOutcome)>
    where
        I: IntoIterator<Item = (S, TaskDeclaration)>,
        S: Into<String>,
    {
        let built = GraphBuilder::build(declarations)?;

        let (id, tracker) = self.registry.new_run(correlation);
        info!("Registered run {}", id);
        tracker.set_graph(built.graph);

        let outcome = self.executor.execute(&built.tasks, &tracker).await;
        Ok((id, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::ExecutionError;
    use crate::engine::task::{callback_fn, task_fn, TaskRunner};
    use crate::engine::NodeStatus;
    use crate::tracking::NoopTracker;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::time::Duration;

    fn constant(value: Value) -> Arc<dyn TaskRunner> {
        task_fn(move |_| {
            let value = value.clone();
            async move { Ok(value) }
        })
    }

    fn failing(message: &'static str) -> Arc<dyn TaskRunner> {
        task_fn(move |_| async move { Err(TaskError::new(message)) })
    }

    fn sum() -> Arc<dyn TaskRunner> {
        task_fn(|inputs: Vec<Value>| async move {
            Ok(json!(inputs.iter().filter_map(Value::as_i64).sum::<i64>()))
        })
    }

    #[derive(Default)]
    struct EventLog {
        events: Mutex<Vec<String>>,
    }

    impl Tracker for EventLog {
        fn set_graph(&self, graph: crate::engine::DependencyGraph) {
            self.events
                .lock()
                .push(format!("graph:{}", graph.nodes.len()));
        }

        fn report_start(&self, task: &str, inputs: &[Value]) {
            self.events
                .lock()
                .push(format!("start:{}:{}", task, Value::from(inputs.to_vec())));
        }

        fn report_return(&self, task: &str, result: &Value) {
            self.events.lock().push(format!("return:{}:{}", task, result));
        }

        fn report_error(&self, task: &str, error: &TaskError) {
            self.events.lock().push(format!("error:{}:{}", task, error));
        }
    }

    #[tokio::test]
    async fn test_chain_feeds_results_in_declared_order() {
        let tasks = GraphBuilder::build(vec![
            ("a", TaskDeclaration::new(constant(json!(1)))),
            ("b", TaskDeclaration::with_dependencies(["a"], sum())),
            ("c", TaskDeclaration::with_dependencies(["b", "a"], sum())),
        ])
        .unwrap()
        .tasks;

        let log = EventLog::default();
        let outcome = TaskExecutor::new().execute(&tasks, &log).await;

        assert!(outcome.is_success());
        assert_eq!(outcome.results["a"], json!(1));
        assert_eq!(outcome.results["b"], json!(1));
        assert_eq!(outcome.results["c"], json!(2));

        let events = log.events.lock();
        assert_eq!(events[0], "start:a:[]");
        assert!(events.contains(&"start:c:[1,1]".to_string()));
    }

    #[tokio::test]
    async fn test_completion_called_once_with_failure() {
        let tasks = GraphBuilder::build(vec![
            ("x", TaskDeclaration::new(failing("E"))),
            ("y", TaskDeclaration::with_dependencies(["x"], sum())),
        ])
        .unwrap()
        .tasks;

        let calls = Mutex::new(Vec::new());
        TaskExecutor::new()
            .run(&tasks, &NoopTracker, |error, results| {
                calls.lock().push((error, results));
            })
            .await;

        let calls = calls.into_inner();
        assert_eq!(calls.len(), 1);
        let (error, results) = &calls[0];
        let failure = error.as_ref().unwrap();
        assert_eq!(failure.task, "x");
        assert_eq!(failure.error.message(), "E");
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_panicking_task_becomes_failure() {
        let exploding = task_fn(|_| async move {
            if true {
                panic!("boom");
            }
            Ok(Value::Null)
        });
        let tasks = GraphBuilder::build(vec![
            ("a", TaskDeclaration::new(constant(json!(1)))),
            ("x", TaskDeclaration::new(exploding)),
            ("y", TaskDeclaration::with_dependencies(["x"], sum())),
        ])
        .unwrap()
        .tasks;

        let log = EventLog::default();
        let calls = Mutex::new(Vec::new());
        TaskExecutor::new()
            .run(&tasks, &log, |error, results| {
                calls.lock().push((error, results));
            })
            .await;

        let calls = calls.into_inner();
        assert_eq!(calls.len(), 1);
        let failure = calls[0].0.as_ref().unwrap();
        assert_eq!(failure.task, "x");
        assert_eq!(failure.error.message(), "task panicked: boom");
        assert!(log
            .events
            .lock()
            .contains(&"error:x:task panicked: boom".to_string()));
        assert!(!log.events.lock().iter().any(|e| e.starts_with("start:y")));
    }

    #[tokio::test]
    async fn test_running_tasks_finish_after_failure() {
        let slow = task_fn(|_| async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok(json!("slow"))
        });

        let tasks = GraphBuilder::build(vec![
            ("fails", TaskDeclaration::new(failing("boom"))),
            ("slow", TaskDeclaration::new(slow)),
            ("after", TaskDeclaration::with_dependencies(["slow"], sum())),
        ])
        .unwrap()
        .tasks;

        let log = EventLog::default();
        let outcome = TaskExecutor::new().execute(&tasks, &log).await;

        assert_eq!(outcome.error.as_ref().unwrap().task, "fails");
        assert_eq!(outcome.results.get("slow"), Some(&json!("slow")));
        assert!(!outcome.results.contains_key("after"));

        let events = log.events.lock();
        assert!(events.contains(&"return:slow:\"slow\"".to_string()));
        assert!(!events.iter().any(|e| e.starts_with("start:after")));
    }

    #[tokio::test]
    async fn test_first_error_wins() {
        let late = task_fn(|_| async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Err(TaskError::new("second"))
        });

        let tasks = GraphBuilder::build(vec![
            ("late", TaskDeclaration::new(late)),
            ("early", TaskDeclaration::new(failing("first"))),
        ])
        .unwrap()
        .tasks;

        let log = EventLog::default();
        let outcome = TaskExecutor::new().execute(&tasks, &log).await;

        assert_eq!(outcome.error.unwrap().error.message(), "first");
        assert!(log
            .events
            .lock()
            .contains(&"error:late:second".to_string()));
    }

    #[tokio::test]
    async fn test_callback_tasks_resolve_dependencies() {
        let double = callback_fn(|inputs, done| {
            let value = inputs[0].as_i64().unwrap_or_default();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                done.ok(value * 2);
            });
        });

        let declarations = vec![
            ("seed", TaskDeclaration::new(constant(json!(21)))),
            (
                "double",
                TaskDeclaration::inferred_callback("function (seed, callback) {", double),
            ),
        ];

        let mut delivered = None;
        auto_track(
            declarations,
            |error, results| delivered = Some((error, results)),
            &NoopTracker,
        )
        .await
        .unwrap();

        let (error, results) = delivered.unwrap();
        assert!(error.is_none());
        assert_eq!(results["double"], json!(42));
    }

    #[tokio::test]
    async fn test_cycle_rejected_before_any_start() {
        let log = EventLog::default();
        let mut called = false;

        let result = auto_track(
            vec![
                ("a", TaskDeclaration::with_dependencies(["b"], sum())),
                ("b", TaskDeclaration::with_dependencies(["a"], sum())),
            ],
            |_, _| called = true,
            &log,
        )
        .await;

        assert!(matches!(
            result,
            Err(ExecutionError::CircularDependency { .. })
        ));
        assert!(!called);
        assert!(log.events.lock().is_empty());
    }

    #[tokio::test]
    async fn test_engine_registers_run() {
        let engine = WorkflowEngine::new();
        let (id, outcome) = engine
            .execute(
                vec![
                    ("a", TaskDeclaration::new(constant(json!(1)))),
                    ("b", TaskDeclaration::inferred("|a|", sum())),
                ],
                Correlation::new("req-1", "/dostuff"),
            )
            .await
            .unwrap();

        assert!(outcome.is_success());
        let record = engine.registry().record(&id).unwrap();
        assert_eq!(record.request_id.as_deref(), Some("req-1"));
        assert_eq!(record.results["b"], json!(1));
        assert_eq!(
            record.graph.unwrap().status("b"),
            Some(NodeStatus::Return)
        );
    }

    #[tokio::test]
    async fn test_engine_registers_nothing_for_invalid_declarations() {
        let engine = WorkflowEngine::new();
        let result = engine
            .execute(
                vec![("a", TaskDeclaration::with_dependencies(["ghost"], sum()))],
                Correlation::default(),
            )
            .await;

        assert!(result.is_err());
        assert!(engine.registry().is_empty());
    }
}
