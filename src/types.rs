//! Common types shared across modules

use serde::{Deserialize, Serialize};

// ============================================================================
// Warehouse Engine
// ============================================================================

/// SQL engine hosting the warehouse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Engine {
    /// Amazon Redshift (Postgres wire protocol)
    Redshift,
    /// Embedded DuckDB, for local runs and tests
    Duckdb,
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Engine::Redshift => write!(f, "redshift"),
            Engine::Duckdb => write!(f, "duckdb"),
        }
    }
}

// ============================================================================
// Error Policy
// ============================================================================

/// What the pipeline does when a statement fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Log the failure, keep executing, report all failures at the end
    #[default]
    Continue,
    /// Stop at the first failure; later statements are reported as skipped
    FailFast,
}

impl ErrorPolicy {
    pub fn stops_on_failure(self) -> bool {
        matches!(self, ErrorPolicy::FailFast)
    }
}

impl std::str::FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "continue" => Ok(ErrorPolicy::Continue),
            "fail_fast" => Ok(ErrorPolicy::FailFast),
            _ => Err(format!(
                "Unknown error policy: {s}. Use 'continue' or 'fail_fast'."
            )),
        }
    }
}

// ============================================================================
// Pipeline Phase
// ============================================================================

/// Pipeline phase; every statement belongs to exactly one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// DROP TABLE IF EXISTS, fact table first
    Drop,
    /// CREATE TABLE IF NOT EXISTS, staging tables first
    Create,
    /// Bulk copy from object storage into staging tables
    Stage,
    /// INSERT ... SELECT from staging into the star schema
    Transform,
}

impl Phase {
    /// All phases in execution order
    pub const ALL: [Phase; 4] = [Phase::Drop, Phase::Create, Phase::Stage, Phase::Transform];

    /// Command label used in log lines
    pub fn command(self) -> &'static str {
        match self {
            Phase::Drop => "TABLE DROP",
            Phase::Create => "TABLE CREATE",
            Phase::Stage => "TABLE COPY",
            Phase::Transform => "TABLE INSERT",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Drop => write!(f, "drop"),
            Phase::Create => write!(f, "create"),
            Phase::Stage => write!(f, "stage"),
            Phase::Transform => write!(f, "transform"),
        }
    }
}
