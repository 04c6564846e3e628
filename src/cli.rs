// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `workplan`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "workplan",
    version,
    about = "Plan dependency-ordered execution of multi-step remote jobs.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the pipeline config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Workplan.toml")]
    pub config: String,

    /// Tier at which execution starts; overrides `[plan].starting_tier`.
    #[arg(long, value_name = "TIER")]
    pub starting_tier: Option<u32>,

    /// Include training steps for trainable kinds; overrides `[plan].train`.
    #[arg(long)]
    pub train: bool,

    /// Write a plan snapshot into this directory.
    #[arg(long, value_name = "DIR")]
    pub snapshot_dir: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WORKPLAN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
