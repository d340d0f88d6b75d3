// ABOUTME: Command line argument definitions and parsing using Clap
// ABOUTME: Defines the main CLI structure and subcommands for autotrack

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "autotrack")]
#[command(about = "Run dependency-inferred task workflows and record every task's lifecycle")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Path to configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Disable colored output")]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a workflow and print its record
    Run {
        #[arg(help = "Path to workflow YAML file")]
        workflow: PathBuf,

        #[arg(long, help = "Correlation id stored on the workflow record")]
        request_id: Option<String>,

        #[arg(long, help = "Free-form context stored on the workflow record")]
        context: Option<String>,

        #[arg(short, long, help = "Write the record to this file instead of stdout")]
        output: Option<PathBuf>,

        #[arg(long, value_enum, help = "Record format")]
        format: Option<OutputFormat>,
    },

    /// Build the dependency graph without running any task
    Validate {
        #[arg(help = "Path to workflow YAML file")]
        workflow: PathBuf,
    },

    /// Print the dependency graph of a workflow
    Graph {
        #[arg(help = "Path to workflow YAML file")]
        workflow: PathBuf,

        #[arg(short, long, help = "Write the graph to this file instead of stdout")]
        output: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Json, help = "Graph format")]
        format: OutputFormat,
    },

    /// Create a sample workflow file
    Init {
        #[arg(help = "Name of the workflow to create")]
        name: String,

        #[arg(short, long, help = "Output directory", default_value = ".")]
        output_dir: PathBuf,
    },
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
