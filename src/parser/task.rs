// ABOUTME: Task configuration as written in workflow files
// ABOUTME: Describes how a task declares its dependencies and which shell command it runs

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::engine::InterfaceStyle;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    pub description: Option<String>,

    /// Explicit dependency list. Takes precedence over `signature`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<Vec<String>>,

    /// Interface text whose parameter names are the dependencies,
    /// e.g. `|fetch, parse|` or `function (fetch, parse, callback)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    #[serde(default)]
    pub style: InterfaceStyle,

    /// Program to execute directly. Mutually exclusive with `script`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Arguments for `command`, ignored in script mode
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Shell script body. Mutually exclusive with `command`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,

    /// Interpreter for `script`; falls back to the configured default shell
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub env: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

/// What a task actually executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskAction {
    Command { program: String, args: Vec<String> },
    Script(String),
}

impl TaskConfig {
    pub fn action(&self) -> Result<TaskAction, String> {
        match (&self.command, &self.script) {
            (Some(_), Some(_)) => Err("'command' and 'script' are mutually exclusive".to_string()),
            (None, None) => Err("either 'command' or 'script' must be set".to_string()),
            (Some(program), None) if program.trim().is_empty() => {
                Err("'command' cannot be empty".to_string())
            }
            (Some(program), None) => Ok(TaskAction::Command {
                program: program.clone(),
                args: self.args.clone(),
            }),
            (None, Some(script)) if script.trim().is_empty() => {
                Err("'script' cannot be empty".to_string())
            }
            (None, Some(script)) => Ok(TaskAction::Script(script.clone())),
        }
    }

    /// True when the task names its dependencies one way or the other.
    pub fn has_dependencies(&self) -> bool {
        self.depends_on.as_ref().is_some_and(|deps| !deps.is_empty()) || self.signature.is_some()
    }
}
