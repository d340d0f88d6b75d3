// ABOUTME: Configuration management for autotrack application
// ABOUTME: Handles loading configuration from YAML files and AUTOTRACK_* environment variables

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::output::OutputFormat;
use crate::tasks::{TaskDefaults, DEFAULT_SHELL};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub tasks: TaskSettings,

    #[serde(default)]
    pub output: OutputSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskSettings {
    /// Interpreter for script tasks that do not name one
    pub shell: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            shell: DEFAULT_SHELL.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file path or default locations
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => Some(p),
            None => Self::find_config_file(),
        };

        let mut config = match config_path {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(&path)?;
                serde_yaml::from_str(&contents)?
            }
            _ => Config::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Find configuration file in standard locations, current directory first
    fn find_config_file() -> Option<PathBuf> {
        let local = ["autotrack.yaml", "autotrack.yml", ".autotrack.yaml", ".autotrack.yml"];
        if let Some(path) = local.iter().map(PathBuf::from).find(|p| p.exists()) {
            return Some(path);
        }

        dirs::home_dir()
            .map(|home| home.join(".autotrack").join("config.yaml"))
            .filter(|path| path.exists())
    }

    /// Apply AUTOTRACK_* overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("AUTOTRACK_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("AUTOTRACK_LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Some(shell) = lookup("AUTOTRACK_SHELL") {
            self.tasks.shell = shell;
        }
        if let Some(format) = lookup("AUTOTRACK_OUTPUT_FORMAT") {
            self.output.format = format.parse()?;
        }

        Ok(())
    }

    pub fn task_defaults(&self) -> TaskDefaults {
        TaskDefaults {
            shell: self.tasks.shell.clone(),
        }
    }
}
