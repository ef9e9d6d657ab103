//! CLI commands and argument parsing

use crate::config::{CONFIG_FILENAME, ENV_CONFIG_PATH};
use crate::types::Phase;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sparkify data warehouse pipeline
#[derive(Parser, Debug)]
#[command(name = "sparkify-dwh")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML or JSON)
    #[arg(short, long, global = true, env = ENV_CONFIG_PATH, default_value = CONFIG_FILENAME)]
    pub config: PathBuf,

    /// Stop at the first failed statement (overrides pipeline.error_policy)
    #[arg(long, global = true)]
    pub fail_fast: bool,

    /// Report output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Drop and recreate every table
    CreateTables,

    /// Copy staged JSON into the staging tables, then populate the star schema
    Etl,

    /// Reset the schema and run the full load in one process
    Run,

    /// Print the rendered statements without connecting
    Sql {
        /// Phase to render (all phases when omitted)
        #[arg(long, value_enum)]
        phase: Option<PhaseArg>,
    },

    /// Connect to the warehouse and run a trivial query
    Check,

    /// Row counts for every catalog table
    Counts,
}

/// Phase selector for `sql`
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PhaseArg {
    Drop,
    Create,
    Stage,
    Transform,
}

impl From<PhaseArg> for Phase {
    fn from(arg: PhaseArg) -> Self {
        match arg {
            PhaseArg::Drop => Phase::Drop,
            PhaseArg::Create => Phase::Create,
            PhaseArg::Stage => Phase::Stage,
            PhaseArg::Transform => Phase::Transform,
        }
    }
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
