pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use clap::{Parser, ValueEnum};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "taskflow-etl")]
#[command(about = "Daily grading ETL: extract, grade, load, report, notify")]
pub struct CliConfig {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override load.output_path from the config file
    #[arg(long)]
    pub output_path: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[arg(long, value_enum, default_value = "compact")]
    pub log_format: LogFormat,

    /// Show the task graph and schedule without running anything
    #[arg(long)]
    pub dry_run: bool,

    /// Keep running and trigger the pipeline once per day
    #[arg(long)]
    pub daemon: bool,
}
