//! featurewatch CLI
//!
//! Operator/demo entry point for the saved-search diffing pipeline: drive
//! a single search through the producer, run the full engine against
//! in-memory transport, or apply pending SQLite migrations.

use clap::{Parser, Subcommand};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "featurewatch")]
#[command(about = "Saved-search diffing and notification pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one saved search through the producer and print the diff.
    RunOnce(commands::run_once::RunOnceArgs),
    /// Run the fan-out, producer, and dispatcher loops against in-memory
    /// transport until interrupted.
    Serve(commands::serve::ServeArgs),
    /// Apply pending SQLite migrations.
    Migrate(commands::migrate::MigrateArgs),
}

#[tokio::main]
async fn main() {
    featurewatch_logging::init(featurewatch_logging::Profile::Development);
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::RunOnce(args) => commands::run_once::execute(args).await,
        Commands::Serve(args) => commands::serve::execute(args).await,
        Commands::Migrate(args) => commands::migrate::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
