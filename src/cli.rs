// asp_migrator/src/cli.rs
// Command Line Interface (CLI) surface for asp_migrator.

use std::path::PathBuf;

use clap::Parser;

/// Command Line Interface for the asp_migrator tool.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// The migration direction to run.
    #[clap(subcommand)]
    pub command: Commands,

    /// Verbose logging (debug level).
    #[clap(short, long)]
    pub verbose: bool,

    /// Write a structured run report (migration_report.json) at the end.
    #[clap(long)]
    pub report: bool,
}

#[derive(Parser, Debug)]
pub enum Commands {
    /// Create source stream processors (collection change stream -> topic)
    Source(RunArgs),
    /// Create sink stream processors (topic -> collection)
    Sink(RunArgs),
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the main configuration JSON file
    pub main_config: PathBuf,

    /// Path to the folder containing connector configuration files
    pub items_folder: PathBuf,

    /// Start each stream processor once it exists
    #[clap(long)]
    pub start: bool,
}
