// ABOUTME: Turns workflow file tasks into engine declarations
// ABOUTME: Every workflow task runs as a shell command task

pub mod command;

use std::sync::Arc;
use tracing::debug;

use crate::engine::{parse_dependencies, ExecutionError, TaskDeclaration, TaskRunner};
use crate::parser::error::{ParserError, Result};
use crate::parser::{TaskConfig, Workflow};

pub use command::CommandTask;
use command::{env_name_collision, env_var_name};

pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Settings applied to tasks that leave them unset.
#[derive(Debug, Clone)]
pub struct TaskDefaults {
    pub shell: String,
}

impl Default for TaskDefaults {
    fn default() -> Self {
        Self {
            shell: DEFAULT_SHELL.to_string(),
        }
    }
}

/// Build one declaration per task, in file order.
///
/// `depends_on` wins over `signature`. A signature is inferred here, once,
/// and the declaration carries the resulting list, so a bad signature fails
/// loading with the engine's `SignatureParse` error.
pub fn declarations_for(
    workflow: &Workflow,
    defaults: &TaskDefaults,
) -> Result<Vec<(String, TaskDeclaration)>> {
    workflow
        .tasks
        .iter()
        .map(|(name, config)| {
            let declaration = declaration_for(name, config, defaults)?;
            Ok((name.clone(), declaration))
        })
        .collect()
}

fn dependency_names(name: &str, config: &TaskConfig) -> Result<Vec<String>> {
    match (&config.depends_on, &config.signature) {
        (Some(explicit), _) => Ok(explicit.clone()),
        (None, Some(signature)) => parse_dependencies(signature, config.style).map_err(|source| {
            ExecutionError::SignatureParse {
                task: name.to_string(),
                source,
            }
            .into()
        }),
        (None, None) => Ok(Vec::new()),
    }
}

fn declaration_for(
    name: &str,
    config: &TaskConfig,
    defaults: &TaskDefaults,
) -> Result<TaskDeclaration> {
    let action = config.action().map_err(|reason| ParserError::InvalidTask {
        task: name.to_string(),
        reason,
    })?;

    let dependencies = dependency_names(name, config)?;
    if let Some((first, second)) = env_name_collision(&dependencies) {
        return Err(ParserError::InvalidTask {
            task: name.to_string(),
            reason: format!(
                "dependencies '{}' and '{}' would share the variable {}",
                first,
                second,
                env_var_name(first)
            ),
        });
    }

    debug!("Task '{}' declares {:?}", name, dependencies);

    let shell = config.shell.as_deref().unwrap_or(&defaults.shell);
    let runner: Arc<dyn TaskRunner> = Arc::new(
        CommandTask::new(name, action, shell)
            .with_dependencies(dependencies.clone())
            .with_env(config.env.clone())
            .with_working_dir(config.working_dir.clone()),
    );

    Ok(if dependencies.is_empty() {
        TaskDeclaration::new(runner)
    } else {
        TaskDeclaration::with_dependencies(dependencies, runner)
    })
}
