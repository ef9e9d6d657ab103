//! CLI module
//!
//! Command-line interface for running the pipeline.
//!
//! # Commands
//!
//! - `create-tables` - Drop and recreate the schema
//! - `etl` - Stage raw JSON and populate the star schema
//! - `run` - Both of the above in one process
//! - `sql` - Print rendered statements without connecting
//! - `check` - Test connection to the warehouse
//! - `counts` - Row counts per table

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat, PhaseArg};
pub use runner::{error_message, Runner};
