// ABOUTME: Shell command task runner fed by dependency results
// ABOUTME: Exposes inputs as environment variables and turns stdout into the task's value

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, info};

use crate::engine::{TaskError, TaskRunner};
use crate::parser::TaskAction;

/// Environment variable holding every input as a JSON array.
pub const INPUTS_ENV: &str = "AUTOTRACK_INPUTS";

/// Prefix of the per-dependency variables, kept apart from the inherited environment.
pub const DEPENDENCY_ENV_PREFIX: &str = "AUTOTRACK_DEP_";

/// Runs a program or script once its dependencies have resolved.
///
/// Each dependency value is exported under [`env_var_name`] of the
/// dependency, so `task1` arrives as `AUTOTRACK_DEP_TASK1`. Strings are exported raw, anything else as JSON.
/// Exit code 0 means success and the trimmed stdout becomes the task's
/// value: parsed as JSON when it is valid JSON, otherwise kept as a string.
#[derive(Debug, Clone)]
pub struct CommandTask {
    name: String,
    dependencies: Vec<String>,
    action: TaskAction,
    shell: String,
    env: IndexMap<String, String>,
    working_dir: Option<PathBuf>,
}

impl CommandTask {
    pub fn new(name: impl Into<String>, action: TaskAction, shell: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            action,
            shell: shell.into(),
            env: IndexMap::new(),
            working_dir: None,
        }
    }

    /// Names used to label inputs, in the order they are passed.
    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_env(mut self, env: IndexMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_working_dir(mut self, working_dir: Option<PathBuf>) -> Self {
        self.working_dir = working_dir;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn input_env(&self, inputs: &[Value]) -> Result<Vec<(String, String)>, TaskError> {
        let mut vars: Vec<(String, String)> = self
            .dependencies
            .iter()
            .zip(inputs)
            .map(|(dependency, value)| (env_var_name(dependency), env_value(value)))
            .collect();

        vars.push((INPUTS_ENV.to_string(), serde_json::to_string(inputs)?));
        Ok(vars)
    }

    fn configure(&self, cmd: &mut Command, inputs: &[(String, String)]) {
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        for (key, value) in inputs {
            cmd.env(key, value);
        }

        if let Some(ref working_dir) = self.working_dir {
            cmd.current_dir(working_dir);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
    }

    async fn execute_script(
        &self,
        script: &str,
        inputs: &[(String, String)],
    ) -> Result<Output, TaskError> {
        let mut script_file = NamedTempFile::new()?;
        script_file.write_all(script.as_bytes())?;

        let script_path = script_file.path();
        let mut perms = std::fs::metadata(script_path)?.permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(script_path, perms)?;

        debug!("Task '{}' script via {} ({} bytes)", self.name, self.shell, script.len());

        let mut cmd = Command::new(&self.shell);
        cmd.arg(script_path);
        self.configure(&mut cmd, inputs);

        // script_file must outlive the child
        let output = cmd.output().await.map_err(|e| {
            TaskError::new(format!("failed to start shell '{}': {}", self.shell, e))
        })?;
        drop(script_file);

        Ok(output)
    }

    async fn execute_command(
        &self,
        program: &str,
        args: &[String],
        inputs: &[(String, String)],
    ) -> Result<Output, TaskError> {
        debug!("Task '{}' command: {} {:?}", self.name, program, args);

        let mut cmd = Command::new(program);
        cmd.args(args);
        self.configure(&mut cmd, inputs);

        cmd.output()
            .await
            .map_err(|e| TaskError::new(format!("failed to start '{}': {}", program, e)))
    }
}

#[async_trait]
impl TaskRunner for CommandTask {
    async fn run(&self, inputs: Vec<Value>) -> Result<Value, TaskError> {
        let vars = self.input_env(&inputs)?;

        info!("Executing command task '{}'", self.name);
        let output = match &self.action {
            TaskAction::Script(script) => self.execute_script(script, &vars).await?,
            TaskAction::Command { program, args } => {
                self.execute_command(program, args, &vars).await?
            }
        };

        interpret_output(output)
    }
}

fn interpret_output(output: Output) -> Result<Value, TaskError> {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if !output.status.success() {
        let status = match output.status.code() {
            Some(code) => format!("exited with code {}", code),
            None => "terminated by signal".to_string(),
        };
        let stderr = stderr.trim();
        return Err(if stderr.is_empty() {
            TaskError::new(status)
        } else {
            TaskError::new(format!("{}: {}", status, stderr))
        });
    }

    Ok(parse_stdout(stdout.trim()))
}

/// Trimmed stdout as JSON when it parses, otherwise as a plain string.
pub fn parse_stdout(stdout: &str) -> Value {
    serde_json::from_str(stdout).unwrap_or_else(|_| Value::String(stdout.to_string()))
}

/// `fetch-user` → `AUTOTRACK_DEP_FETCH_USER`
pub fn env_var_name(dependency: &str) -> String {
    let suffix = dependency.chars().map(|c| {
        if c.is_ascii_alphanumeric() {
            c.to_ascii_uppercase()
        } else {
            '_'
        }
    });

    DEPENDENCY_ENV_PREFIX.chars().chain(suffix).collect()
}

/// First pair of dependencies that would be exported under the same variable.
pub fn env_name_collision(dependencies: &[String]) -> Option<(&str, &str)> {
    let mut seen: IndexMap<String, &str> = IndexMap::new();

    for dependency in dependencies {
        if let Some(previous) = seen.insert(env_var_name(dependency), dependency.as_str()) {
            return Some((previous, dependency.as_str()));
        }
    }

    None
}

fn env_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn script(body: &str) -> CommandTask {
        CommandTask::new("t", TaskAction::Script(body.to_string()), "/bin/sh")
    }

    #[test]
    fn test_env_var_name() {
        assert_eq!(env_var_name("task1"), "AUTOTRACK_DEP_TASK1");
        assert_eq!(env_var_name("fetch-user.data"), "AUTOTRACK_DEP_FETCH_USER_DATA");
        assert_eq!(env_var_name("$x"), "AUTOTRACK_DEP__X");
    }

    #[test]
    fn test_env_name_collision() {
        let distinct = vec!["a".to_string(), "b".to_string()];
        assert_eq!(env_name_collision(&distinct), None);

        let clashing = vec!["a-b".to_string(), "c".to_string(), "a_b".to_string()];
        assert_eq!(env_name_collision(&clashing), Some(("a-b", "a_b")));
    }

    #[test]
    fn test_parse_stdout() {
        assert_eq!(parse_stdout("42"), json!(42));
        assert_eq!(parse_stdout(r#"{"a": [1, 2]}"#), json!({"a": [1, 2]}));
        assert_eq!(parse_stdout("hello world"), json!("hello world"));
        assert_eq!(parse_stdout(""), json!(""));
    }

    #[tokio::test]
    async fn test_simple_command_execution() {
        let task = CommandTask::new(
            "echo",
            TaskAction::Command {
                program: "echo".to_string(),
                args: vec!["hello world".to_string()],
            },
            "/bin/sh",
        );

        let value = task.run(Vec::new()).await.unwrap();
        assert_eq!(value, json!("hello world"));
    }

    #[tokio::test]
    async fn test_script_reads_dependency_env() {
        let task = script(r#"echo "$(( AUTOTRACK_DEP_TASK1 + 1 )) $AUTOTRACK_DEP_LABEL""#)
            .with_dependencies(vec!["task1".to_string(), "label".to_string()]);

        let value = task.run(vec![json!(41), json!("done")]).await.unwrap();
        assert_eq!(value, json!("42 done"));
    }

    #[tokio::test]
    async fn test_inputs_exported_as_json_array() {
        let task = script(r#"printf '%s' "$AUTOTRACK_INPUTS""#)
            .with_dependencies(vec!["a".to_string(), "b".to_string()]);

        let value = task.run(vec![json!({"k": 1}), json!("s")]).await.unwrap();
        assert_eq!(value, json!([{"k": 1}, "s"]));
    }

    #[tokio::test]
    async fn test_static_env_and_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = IndexMap::new();
        env.insert("GREETING".to_string(), "hi".to_string());

        let task = script(r#"echo "$GREETING"; pwd > where.txt"#)
            .with_env(env)
            .with_working_dir(Some(dir.path().to_path_buf()));

        assert_eq!(task.run(Vec::new()).await.unwrap(), json!("hi"));
        assert!(dir.path().join("where.txt").exists());
    }

    #[tokio::test]
    async fn test_dependency_named_path_keeps_environment() {
        let task = CommandTask::new(
            "list",
            TaskAction::Command {
                program: "ls".to_string(),
                args: vec!["/".to_string()],
            },
            "/bin/sh",
        )
        .with_dependencies(vec!["path".to_string()]);

        assert!(task.run(vec![json!("done")]).await.is_ok());

        let exported = script(r#"printf '%s' "$AUTOTRACK_DEP_PATH""#)
            .with_dependencies(vec!["path".to_string()]);
        assert_eq!(exported.run(vec![json!("done")]).await.unwrap(), json!("done"));
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_task_error() {
        let task = script("echo 'no such thing' >&2; exit 3");

        let error = task.run(Vec::new()).await.unwrap_err();
        assert_eq!(error.message(), "exited with code 3: no such thing");
    }

    #[tokio::test]
    async fn test_missing_program_is_task_error() {
        let task = CommandTask::new(
            "missing",
            TaskAction::Command {
                program: "/definitely/not/a/program".to_string(),
                args: Vec::new(),
            },
            "/bin/sh",
        );

        let error = task.run(Vec::new()).await.unwrap_err();
        assert!(error.message().starts_with("failed to start"));
    }
}
