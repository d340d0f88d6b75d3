// ABOUTME: Task runner abstraction and task declaration shapes
// ABOUTME: Normalizes zero-dependency, explicit-list and inferred declarations into task specs

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;

use super::error::{ExecutionError, Result, TaskError};
use super::inspector::{self, InterfaceStyle};

/// A unit of work that receives its resolved dependency values positionally,
/// in the order the task declared them.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    async fn run(&self, inputs: Vec<Value>) -> std::result::Result<Value, TaskError>;
}

/// Runner backed by an async closure.
pub struct FnRunner<F> {
    func: F,
}

#[async_trait]
impl<F, Fut> TaskRunner for FnRunner<F>
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<Value, TaskError>> + Send + 'static,
{
    async fn run(&self, inputs: Vec<Value>) -> std::result::Result<Value, TaskError> {
        (self.func)(inputs).await
    }
}

/// Continuation handed to callback-style runners. Consumed on use, so a task
/// can report at most once.
#[derive(Debug)]
pub struct Completion {
    sender: oneshot::Sender<std::result::Result<Value, TaskError>>,
}

impl Completion {
    pub fn done(self, result: std::result::Result<Value, TaskError>) {
        // The receiver only disappears when the run itself was dropped.
        let _ = self.sender.send(result);
    }

    pub fn ok(self, value: impl Into<Value>) {
        self.done(Ok(value.into()));
    }

    pub fn fail(self, error: impl Into<TaskError>) {
        self.done(Err(error.into()));
    }
}

/// Runner backed by a closure that reports through a [`Completion`], possibly
/// from a spawned task or timer.
pub struct CallbackRunner<F> {
    func: F,
}

#[async_trait]
impl<F> TaskRunner for CallbackRunner<F>
where
    F: Fn(Vec<Value>, Completion) + Send + Sync,
{
    async fn run(&self, inputs: Vec<Value>) -> std::result::Result<Value, TaskError> {
        let (sender, receiver) = oneshot::channel();
        (self.func)(inputs, Completion { sender });

        receiver.await.unwrap_or_else(|_| {
            Err(TaskError::new(
                "task dropped its completion without reporting a result",
            ))
        })
    }
}

/// Wrap an async closure as a shareable runner.
pub fn task_fn<F, Fut>(func: F) -> Arc<dyn TaskRunner>
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<Value, TaskError>> + Send + 'static,
{
    Arc::new(FnRunner { func })
}

/// Wrap a continuation-style closure as a shareable runner.
pub fn callback_fn<F>(func: F) -> Arc<dyn TaskRunner>
where
    F: Fn(Vec<Value>, Completion) + Send + Sync + 'static,
{
    Arc::new(CallbackRunner { func })
}

/// Normalized task: a name, its ordered dependencies and the runner.
#[derive(Clone)]
pub struct TaskSpec {
    pub name: String,
    pub dependencies: Vec<String>,
    pub runner: Arc<dyn TaskRunner>,
}

impl fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSpec")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

impl TaskSpec {
    pub fn new(
        name: impl Into<String>,
        dependencies: Vec<String>,
        runner: Arc<dyn TaskRunner>,
    ) -> Self {
        Self {
            name: name.into(),
            dependencies,
            runner,
        }
    }
}

/// The shapes a task may be declared in.
#[derive(Clone)]
pub enum TaskDeclaration {
    NoDependencies(Arc<dyn TaskRunner>),
    WithDependencies(Vec<String>, Arc<dyn TaskRunner>),
    /// Dependencies are read from the declared interface text.
    Inferred {
        interface: String,
        style: InterfaceStyle,
        runner: Arc<dyn TaskRunner>,
    },
}

impl fmt::Debug for TaskDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDependencies(_) => f.write_str("NoDependencies"),
            Self::WithDependencies(names, _) => {
                f.debug_tuple("WithDependencies").field(names).finish()
            }
            Self::Inferred {
                interface, style, ..
            } => f
                .debug_struct("Inferred")
                .field("interface", interface)
                .field("style", style)
                .finish_non_exhaustive(),
        }
    }
}

impl TaskDeclaration {
    pub fn new(runner: Arc<dyn TaskRunner>) -> Self {
        Self::NoDependencies(runner)
    }

    pub fn with_dependencies<I, S>(dependencies: I, runner: Arc<dyn TaskRunner>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::WithDependencies(
            dependencies.into_iter().map(Into::into).collect(),
            runner,
        )
    }

    pub fn inferred(interface: impl Into<String>, runner: Arc<dyn TaskRunner>) -> Self {
        Self::Inferred {
            interface: interface.into(),
            style: InterfaceStyle::Async,
            runner,
        }
    }

    pub fn inferred_callback(interface: impl Into<String>, runner: Arc<dyn TaskRunner>) -> Self {
        Self::Inferred {
            interface: interface.into(),
            style: InterfaceStyle::Callback,
            runner,
        }
    }

    /// Resolve the ordered dependency names. Only the inferred form consults
    /// the inspector.
    pub fn dependencies(&self, task: &str) -> Result<Vec<String>> {
        match self {
            Self::NoDependencies(_) => Ok(Vec::new()),
            Self::WithDependencies(names, _) => Ok(names.clone()),
            Self::Inferred {
                interface, style, ..
            } => inspector::parse_dependencies(interface, *style).map_err(|source| {
                ExecutionError::SignatureParse {
                    task: task.to_string(),
                    source,
                }
            }),
        }
    }

    pub fn runner(&self) -> &Arc<dyn TaskRunner> {
        match self {
            Self::NoDependencies(runner)
            | Self::WithDependencies(_, runner)
            | Self::Inferred { runner, .. } => runner,
        }
    }

    /// Normalize into a [`TaskSpec`] under the given name.
    pub fn into_spec(self, name: impl Into<String>) -> Result<TaskSpec> {
        let name = name.into();
        let dependencies = self.dependencies(&name)?;
        let runner = Arc::clone(self.runner());
        Ok(TaskSpec {
            name,
            dependencies,
            runner,
        })
    }
}
