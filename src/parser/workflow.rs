// ABOUTME: Workflow file structure and YAML loading
// ABOUTME: Task order in the file is the declaration order used by the engine

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::debug;

use super::error::{ParserError, Result};
use super::task::TaskConfig;

fn default_version() -> String {
    "1.0".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_version")]
    pub version: String,
    pub tasks: IndexMap<String, TaskConfig>,
}

impl Workflow {
    /// Parse workflow from YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        let workflow: Workflow = serde_yaml::from_str(content)?;
        workflow.validate_structure()?;
        Ok(workflow)
    }

    /// Check what can be checked without building the graph. Unknown
    /// dependencies and cycles are left to the engine.
    fn validate_structure(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ParserError::MissingField("name".to_string()));
        }

        if self.tasks.is_empty() {
            return Err(ParserError::EmptyWorkflow);
        }

        for (name, task) in &self.tasks {
            if name.trim().is_empty() {
                return Err(ParserError::InvalidTask {
                    task: name.clone(),
                    reason: "task name cannot be empty".to_string(),
                });
            }

            task.action().map_err(|reason| ParserError::InvalidTask {
                task: name.clone(),
                reason,
            })?;
        }

        Ok(())
    }

    pub fn task_names(&self) -> Vec<String> {
        self.tasks.keys().cloned().collect()
    }

    pub fn get_task(&self, name: &str) -> Option<&TaskConfig> {
        self.tasks.get(name)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowParser;

impl WorkflowParser {
    pub fn new() -> Self {
        Self
    }

    pub async fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Workflow> {
        let path = path.as_ref();
        debug!("Loading workflow from {}", path.display());
        let content = fs::read_to_string(path).await?;
        self.parse_string(&content)
    }

    pub fn parse_string(&self, content: &str) -> Result<Workflow> {
        Workflow::from_yaml(content)
    }
}
