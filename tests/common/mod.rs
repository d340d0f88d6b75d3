// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: Provides task runner builders, a recording tracker and workflow file fixtures

#![allow(dead_code)]

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::fs;

use autotrack::engine::{task_fn, DependencyGraph, TaskError, TaskRunner};
use autotrack::tracking::Tracker;

pub fn constant(value: Value) -> Arc<dyn TaskRunner> {
    task_fn(move |_| {
        let value = value.clone();
        async move { Ok(value) }
    })
}

/// Sums every numeric input.
pub fn sum() -> Arc<dyn TaskRunner> {
    task_fn(|inputs: Vec<Value>| async move {
        Ok(json!(inputs.iter().filter_map(Value::as_i64).sum::<i64>()))
    })
}

pub fn failing(message: &'static str) -> Arc<dyn TaskRunner> {
    task_fn(move |_| async move { Err(TaskError::new(message)) })
}

pub fn delayed(millis: u64, value: Value) -> Arc<dyn TaskRunner> {
    task_fn(move |_| {
        let value = value.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(millis)).await;
            Ok(value)
        }
    })
}

/// Wraps a runner, counting calls and recording the inputs of each call.
#[derive(Default)]
pub struct CallLog {
    pub calls: Mutex<Vec<(String, Vec<Value>)>>,
}

impl CallLog {
    pub fn wrap(self: &Arc<Self>, name: &str, inner: Arc<dyn TaskRunner>) -> Arc<dyn TaskRunner> {
        let log = Arc::clone(self);
        let name = name.to_string();
        task_fn(move |inputs: Vec<Value>| {
            log.calls.lock().push((name.clone(), inputs.clone()));
            let inner = Arc::clone(&inner);
            async move { inner.run(inputs).await }
        })
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|(n, _)| n == name).count()
    }

    pub fn inputs_of(&self, name: &str) -> Option<Vec<Value>> {
        self.calls
            .lock()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, inputs)| inputs.clone())
    }
}

/// Tracks how many runners are inside their body at the same time.
#[derive(Default)]
pub struct ConcurrencyProbe {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyProbe {
    pub fn runner(self: &Arc<Self>, millis: u64) -> Arc<dyn TaskRunner> {
        let probe = Arc::clone(self);
        task_fn(move |_| {
            let probe = Arc::clone(&probe);
            async move {
                let now = probe.current.fetch_add(1, Ordering::SeqCst) + 1;
                probe.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(millis)).await;
                probe.current.fetch_sub(1, Ordering::SeqCst);
                Ok(Value::Null)
            }
        })
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Graph(DependencyGraph),
    Start(String, Vec<Value>),
    Return(String, Value),
    Error(String, String),
}

/// Tracker that keeps every event in arrival order.
#[derive(Default)]
pub struct RecordingTracker {
    pub events: Mutex<Vec<Event>>,
}

impl RecordingTracker {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn started(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                Event::Start(name, _) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Tracker for RecordingTracker {
    fn set_graph(&self, graph: DependencyGraph) {
        self.events.lock().push(Event::Graph(graph));
    }

    fn report_start(&self, task: &str, inputs: &[Value]) {
        self.events
            .lock()
            .push(Event::Start(task.to_string(), inputs.to_vec()));
    }

    fn report_return(&self, task: &str, result: &Value) {
        self.events
            .lock()
            .push(Event::Return(task.to_string(), result.clone()));
    }

    fn report_error(&self, task: &str, error: &TaskError) {
        self.events
            .lock()
            .push(Event::Error(task.to_string(), error.message().to_string()));
    }
}

pub struct TestTask {
    pub id: String,
    pub script: String,
    pub depends_on: Option<Vec<String>>,
    pub signature: Option<String>,
}

pub struct TestWorkflowBuilder {
    name: String,
    description: String,
    tasks: Vec<TestTask>,
}

impl TestWorkflowBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: format!("Test workflow: {}", name),
            tasks: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn add_script_task(mut self, id: &str, script: &str) -> Self {
        self.tasks.push(TestTask {
            id: id.to_string(),
            script: script.to_string(),
            depends_on: None,
            signature: None,
        });
        self
    }

    pub fn add_dependent_task(mut self, id: &str, script: &str, depends_on: Vec<&str>) -> Self {
        self.tasks.push(TestTask {
            id: id.to_string(),
            script: script.to_string(),
            depends_on: Some(depends_on.into_iter().map(str::to_string).collect()),
            signature: None,
        });
        self
    }

    pub fn add_signature_task(mut self, id: &str, script: &str, signature: &str) -> Self {
        self.tasks.push(TestTask {
            id: id.to_string(),
            script: script.to_string(),
            depends_on: None,
            signature: Some(signature.to_string()),
        });
        self
    }

    pub fn add_failing_task(self, id: &str) -> Self {
        self.add_script_task(id, "echo 'failure requested' >&2; exit 1")
    }

    pub async fn write_to_file(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        fs::write(path, self.generate_yaml()).await?;
        Ok(())
    }

    fn generate_yaml(&self) -> String {
        let mut yaml = format!(
            "name: {}\ndescription: \"{}\"\n\ntasks:\n",
            self.name, self.description
        );

        for task in &self.tasks {
            yaml.push_str(&format!("  {}:\n", task.id));
            // Single-quoted YAML keeps shell `$` and `"` untouched
            yaml.push_str(&format!("    script: '{}'\n", task.script.replace('\'', "''")));

            if let Some(ref deps) = task.depends_on {
                yaml.push_str(&format!("    depends_on: [{}]\n", deps.join(", ")));
            }
            if let Some(ref signature) = task.signature {
                yaml.push_str(&format!("    signature: \"{}\"\n", signature));
            }
        }

        yaml
    }
}

pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn workflow_file(&self, name: &str) -> PathBuf {
        self.path().join(format!("{}.yaml", name))
    }

    pub fn output_file(&self, name: &str) -> PathBuf {
        self.path().join(format!("{}_record.json", name))
    }

    pub async fn create_workflow_file(&self, name: &str, builder: &TestWorkflowBuilder) -> PathBuf {
        let workflow_file = self.workflow_file(name);
        builder
            .write_to_file(&workflow_file)
            .await
            .expect("Failed to write workflow file");
        workflow_file
    }
}
