//! Jewel Ops CLI - sales analysis and back-office tools.
//!
//! # Usage
//!
//! ```bash
//! # Analyse 2024 for two stores, grouped by family then supplier
//! jo-cli analyze --start 2024-01-01 --end 2024-12-31 --store 1 --store 2
//!
//! # Flat product lists under suppliers, pretty-printed
//! jo-cli analyze --start 2024-01-01 --end 2024-12-31 \
//!     --hierarchy supplier --leaf products --pretty
//! ```
//!
//! # Commands
//!
//! - `analyze` - Run the sales analysis and print the JSON tree

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::analyze::AnalyzeArgs;

#[derive(Parser)]
#[command(name = "jo-cli")]
#[command(author, version, about = "Jewel Ops CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sales analysis against the ERP database
    Analyze(AnalyzeArgs),
}

#[tokio::main]
async fn main() {
    // Initialize tracing (stderr, so the JSON on stdout stays clean)
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Analyze(args) => commands::analyze::run(args).await?,
    }
    Ok(())
}
