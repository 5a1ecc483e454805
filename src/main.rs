// asp_migrator/src/main.rs
// Entry point for the asp-migrator CLI application.

use std::process::ExitCode;

use asp_migrator::atlas::AtlasCli;
use asp_migrator::cli::{Cli, Commands, RunArgs};
use asp_migrator::config::{Direction, MainConfig};
use asp_migrator::error::{MigratorError, Result};
use asp_migrator::kafka::ConfluentRest;
use asp_migrator::runner::{BulkRunner, ItemOutcome, RunReport};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let file_appender = tracing_appender::rolling::never(".", "migrator.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    let (direction, args) = match &cli.command {
        Commands::Source(args) => (Direction::Source, args),
        Commands::Sink(args) => (Direction::Sink, args),
    };

    match run(direction, args).await {
        Ok(report) => {
            render_report(&report);
            if cli.report {
                if let Err(e) = save_report(&report) {
                    error!("{}", e);
                    return ExitCode::FAILURE;
                }
            }
            if report.succeeded() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        },
    }
}

async fn run(direction: Direction, args: &RunArgs) -> Result<RunReport> {
    info!("Loading main configuration from {}", args.main_config.display());
    let main = MainConfig::load(&args.main_config)?;
    info!("  Queue cluster: {}", main.cluster_id);
    info!("  REST endpoint: {}", main.rest_endpoint);
    info!("  Instance URL: {}", main.instance_url);
    info!("  Processor prefix: {}", main.processor_prefix);

    let platform = AtlasCli::new(&main);
    let topics = ConfluentRest::new(&main);
    let runner = BulkRunner::new(&main, &platform, &topics, direction, args.start);
    runner.run(&args.items_folder).await
}

fn render_report(report: &RunReport) {
    for item in &report.items {
        let processor = item.processor.as_deref().unwrap_or("-");
        match &item.outcome {
            ItemOutcome::Created => {
                println!("✓ {}: created {}", item.file, processor);
            },
            ItemOutcome::AlreadyExists => {
                println!("⚠ {}: {} already exists, skipped", item.file, processor);
            },
            ItemOutcome::Failed { step, error } => {
                println!("✗ {}: failed at {} step: {}", item.file, step.as_str(), error);
            },
        }
    }
    println!(
        "Summary: {} created, {} skipped, {} failed",
        report.created, report.skipped, report.failed
    );
}

fn save_report(report: &RunReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| MigratorError::Other(format!("Failed to serialize run report: {}", e)))?;
    std::fs::write("migration_report.json", json)
        .map_err(|e| MigratorError::Other(format!("Failed to write migration_report.json: {}", e)))?;
    info!("Run report saved to migration_report.json");
    Ok(())
}
