// ABOUTME: Output handling for workflow records and dependency graphs
// ABOUTME: Renders JSON, YAML or text and writes to stdout or a file

pub mod error;
pub mod formatter;
pub mod writer;

pub use error::{OutputError, Result};
pub use formatter::{JsonFormatter, OutputFormat, OutputFormatter, TextFormatter, YamlFormatter};
pub use writer::{write_output, OutputTarget};

use crate::engine::DependencyGraph;
use crate::tracking::WorkflowRecord;

/// Render a record and send it to `target`.
pub async fn output_record(
    record: &WorkflowRecord,
    format: OutputFormat,
    target: &OutputTarget,
) -> Result<()> {
    let rendered = format.formatter().format_record(record)?;
    write_output(&rendered, target).await
}

/// Render a graph and send it to `target`.
pub async fn output_graph(
    graph: &DependencyGraph,
    format: OutputFormat,
    target: &OutputTarget,
) -> Result<()> {
    let rendered = format.formatter().format_graph(graph)?;
    write_output(&rendered, target).await
}
