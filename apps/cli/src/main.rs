//! deepresearch CLI — multi-agent web research from the terminal.
//!
//! Runs a query through the searcher → analyst → writer pipeline, or does a
//! quick single search, against a local model server.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
