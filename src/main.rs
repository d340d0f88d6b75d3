// ABOUTME: Binary entry point for the autotrack CLI
// ABOUTME: Parses arguments once, loads configuration and runs the selected command

use anyhow::Result;
use autotrack::cli::{App, Args};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();
    let app = App::from_args(&args)?;

    app.run(args).await
}
