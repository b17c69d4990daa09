use crate::constants::{verbosity, DEFAULT_REGISTRY_DIR};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::path::PathBuf;

/// Genesis - module-based project scaffolding.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity (`-v`, `-vv`, `-vvv`).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Module registry directory (providers.yaml plus one directory per module).
    #[arg(short, long, global = true, default_value = DEFAULT_REGISTRY_DIR)]
    pub registry: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a project from a module configuration.
    #[command(visible_alias = "gen")]
    Generate(GenerateArgs),

    /// Run a scenario file and report every failed check.
    Check(CheckArgs),
}

/// Arguments for the generate command.
#[derive(Parser, Debug, Clone)]
pub struct GenerateArgs {
    /// Directory containing genesis.json, genesis.yaml or genesis.yml.
    #[arg(value_name = "CONFIG_DIR")]
    pub config_dir: PathBuf,

    /// Destination directory for generated files.
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Force overwrite of an existing output directory.
    #[arg(short, long)]
    pub force: bool,

    /// Preview actions without touching the filesystem.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

/// Arguments for the check command.
#[derive(Parser, Debug, Clone)]
pub struct CheckArgs {
    /// Scenario file (YAML or JSON).
    #[arg(value_name = "SCENARIO_FILE")]
    pub scenario_file: PathBuf,
}

/// Parse command line arguments.
pub fn get_cli() -> Cli {
    Cli::parse()
}

/// Map `-v` counts to the appropriate log level.
pub fn get_log_level_from_verbose(verbose_count: u8) -> LevelFilter {
    match verbose_count {
        verbosity::OFF => LevelFilter::Error,
        verbosity::INFO => LevelFilter::Info,
        verbosity::DEBUG => LevelFilter::Debug,
        verbosity::TRACE.. => LevelFilter::Trace,
    }
}
