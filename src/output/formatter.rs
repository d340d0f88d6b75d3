// ABOUTME: Formatters rendering workflow records and dependency graphs
// ABOUTME: JSON and YAML mirror the serde model, text is a human summary

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::str::FromStr;

use super::error::{OutputError, Result};
use crate::engine::{DependencyGraph, NodeStatus};
use crate::tracking::WorkflowRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Text,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Text => "text",
        }
    }

    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        match self {
            OutputFormat::Json => Box::new(JsonFormatter::new_pretty()),
            OutputFormat::Yaml => Box::new(YamlFormatter),
            OutputFormat::Text => Box::new(TextFormatter),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = OutputError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            "text" | "txt" => Ok(OutputFormat::Text),
            other => Err(OutputError::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait OutputFormatter: Send + Sync {
    fn format_record(&self, record: &WorkflowRecord) -> Result<String>;

    fn format_graph(&self, graph: &DependencyGraph) -> Result<String>;
}

pub struct JsonFormatter {
    pretty: bool,
}

pub struct YamlFormatter;

pub struct TextFormatter;

impl JsonFormatter {
    pub fn new() -> Self {
        Self { pretty: false }
    }

    pub fn new_pretty() -> Self {
        Self { pretty: true }
    }

    fn render<T: Serialize>(&self, value: &T) -> Result<String> {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(rendered)
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_record(&self, record: &WorkflowRecord) -> Result<String> {
        self.render(record)
    }

    fn format_graph(&self, graph: &DependencyGraph) -> Result<String> {
        self.render(graph)
    }
}

impl OutputFormatter for YamlFormatter {
    fn format_record(&self, record: &WorkflowRecord) -> Result<String> {
        Ok(serde_yaml::to_string(record)?)
    }

    fn format_graph(&self, graph: &DependencyGraph) -> Result<String> {
        Ok(serde_yaml::to_string(graph)?)
    }
}

fn status_icon(status: NodeStatus) -> &'static str {
    match status {
        NodeStatus::Return => "✓",
        NodeStatus::Error => "✗",
        NodeStatus::Start => "⟳",
        NodeStatus::NotRun => "⊘",
    }
}

impl OutputFormatter for TextFormatter {
    fn format_record(&self, record: &WorkflowRecord) -> Result<String> {
        let mut output = String::new();
        let summary = record.summary();

        // writeln! into a String cannot fail
        let _ = writeln!(output, "Run: {}", record.id);
        if let Some(ref request_id) = record.request_id {
            let _ = writeln!(output, "Request: {}", request_id);
        }
        if let Some(ref context) = record.context {
            let _ = writeln!(output, "Context: {}", context);
        }
        let _ = writeln!(
            output,
            "Started: {}",
            record.time.format("%Y-%m-%d %H:%M:%S UTC")
        );
        let _ = writeln!(
            output,
            "Status: {}",
            if record.is_failed() { "failed" } else { "success" }
        );

        output.push_str("\nSummary:\n");
        let _ = writeln!(output, "  Total tasks: {}", summary.total);
        let _ = writeln!(output, "  Returned: {}", summary.returned);
        let _ = writeln!(output, "  Errored: {}", summary.errored);
        let _ = writeln!(output, "  Not run: {}", summary.not_run);

        let Some(ref graph) = record.graph else {
            return Ok(output);
        };

        output.push_str("\nTasks:\n");
        for node in &graph.nodes {
            let _ = write!(output, "  {} {}", status_icon(node.status), node.name);
            if let Some(duration) = record.task_duration(&node.name) {
                let _ = write!(output, " [{:.2}s]", duration.as_secs_f64());
            }
            if node.status == NodeStatus::NotRun {
                output.push_str(" (not run)");
            }
            output.push('\n');

            if let Some(inputs) = record.inputs.get(&node.name) {
                if !inputs.is_empty() {
                    let _ = writeln!(output, "      Inputs: {}", serde_json::to_string(inputs)?);
                }
            }
            if let Some(result) = record.results.get(&node.name) {
                let _ = writeln!(output, "      Result: {}", result);
            }
            if let Some(error) = record.errors.get(&node.name) {
                let _ = writeln!(output, "      Error: {}", error);
            }
        }

        Ok(output)
    }

    fn format_graph(&self, graph: &DependencyGraph) -> Result<String> {
        let mut output = String::new();
        for node in &graph.nodes {
            let dependencies = graph.dependencies_of(&node.name);
            if dependencies.is_empty() {
                let _ = writeln!(output, "{}", node.name);
            } else {
                let _ = writeln!(output, "{} <- {}", node.name, dependencies.join(", "));
            }
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{task_fn, GraphBuilder, TaskDeclaration, TaskError};
    use crate::tracking::{Correlation, Tracker, WorkflowRegistry};
    use serde_json::{json, Value};

    fn finished_record() -> WorkflowRecord {
        let runner = task_fn(|_| async { Ok(Value::Null) });
        let graph = GraphBuilder::build(vec![
            ("fetch", TaskDeclaration::new(runner.clone())),
            ("parse", TaskDeclaration::with_dependencies(["fetch"], runner.clone())),
            ("store", TaskDeclaration::with_dependencies(["parse"], runner)),
        ])
        .unwrap()
        .graph;

        let registry = WorkflowRegistry::new();
        let (_, tracker) = registry.new_run(Correlation::new("req-7", "/import"));
        tracker.set_graph(graph);
        tracker.report_start("fetch", &[]);
        tracker.report_return("fetch", &json!({"rows": 3}));
        tracker.report_start("parse", &[json!({"rows": 3})]);
        tracker.report_error("parse", &TaskError::new("bad row"));
        tracker.snapshot()
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("yml".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_json_formatter() {
        let record = finished_record();
        let output = JsonFormatter::new().format_record(&record).unwrap();

        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["request_id"], json!("req-7"));
        assert_eq!(parsed["errors"]["parse"], json!("bad row"));
        assert_eq!(parsed["graph"]["nodes"][2]["status"], json!("not_run"));
    }

    #[test]
    fn test_yaml_formatter() {
        let record = finished_record();
        let output = YamlFormatter.format_record(&record).unwrap();

        assert!(output.contains("request_id: req-7"));
        assert!(output.contains("status: error"));
    }

    #[test]
    fn test_text_formatter() {
        let record = finished_record();
        let output = TextFormatter.format_record(&record).unwrap();

        assert!(output.contains("Request: req-7"));
        assert!(output.contains("Status: failed"));
        assert!(output.contains("Errored: 1"));
        assert!(output.contains("✓ fetch"));
        assert!(output.contains("Error: bad row"));
        assert!(output.contains("⊘ store (not run)"));
    }

    #[test]
    fn test_text_graph() {
        let record = finished_record();
        let output = TextFormatter
            .format_graph(record.graph.as_ref().unwrap())
            .unwrap();

        assert_eq!(output, "fetch\nparse <- fetch\nstore <- parse\n");
    }
}
