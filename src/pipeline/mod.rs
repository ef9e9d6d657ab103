//! Pipeline driver
//!
//! Sequences the reset and load phases against a single warehouse
//! connection. Statements run one at a time, each committed on its own.
//!
//! # Overview
//!
//! - [`Pipeline::reset_schema`] - drop every table, then create every table
//! - [`Pipeline::load_staging`] - bulk copy into the staging tables
//! - [`Pipeline::load_warehouse`] - populate the star schema from staging
//! - [`Pipeline::run_load`] / [`Pipeline::run_all`] - the phases chained
//!
//! A failed statement never aborts the run under [`ErrorPolicy::Continue`];
//! under [`ErrorPolicy::FailFast`] every later statement is reported as
//! skipped. Either way the caller gets a [`RunReport`].

mod types;

pub use types::{OutcomeStatus, PhaseReport, RunReport, RunSummary, StatementOutcome};

use crate::error::{Error, Result};
use crate::statements::{Statement, StatementBuilder};
use crate::types::{ErrorPolicy, Phase};
use crate::warehouse::Warehouse;
use std::time::Instant;

/// Runs pipeline phases against a warehouse
pub struct Pipeline {
    builder: StatementBuilder,
    policy: ErrorPolicy,
}

impl Pipeline {
    pub fn new(builder: StatementBuilder, policy: ErrorPolicy) -> Self {
        Self { builder, policy }
    }

    pub fn builder(&self) -> &StatementBuilder {
        &self.builder
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// Drop all tables (fact first), then create all tables (staging first)
    pub async fn reset_schema(&self, warehouse: &mut dyn Warehouse) -> Result<RunReport> {
        self.run_phases(warehouse, &[Phase::Drop, Phase::Create])
            .await
    }

    /// Bulk copy raw JSON into the staging tables
    pub async fn load_staging(&self, warehouse: &mut dyn Warehouse) -> Result<RunReport> {
        self.run_phases(warehouse, &[Phase::Stage]).await
    }

    /// INSERT ... SELECT into the star schema
    pub async fn load_warehouse(&self, warehouse: &mut dyn Warehouse) -> Result<RunReport> {
        self.run_phases(warehouse, &[Phase::Transform]).await
    }

    /// Staging copy followed by the star-schema transforms
    pub async fn run_load(&self, warehouse: &mut dyn Warehouse) -> Result<RunReport> {
        self.run_phases(warehouse, &[Phase::Stage, Phase::Transform])
            .await
    }

    /// Reset followed by the full load
    pub async fn run_all(&self, warehouse: &mut dyn Warehouse) -> Result<RunReport> {
        self.run_phases(warehouse, &Phase::ALL).await
    }

    /// Render every phase up front, then execute them in order.
    ///
    /// Catalog and rendering errors (a fact table created before its
    /// dimensions, a missing IAM role) surface before anything touches the
    /// warehouse.
    pub async fn run_phases(
        &self,
        warehouse: &mut dyn Warehouse,
        phases: &[Phase],
    ) -> Result<RunReport> {
        self.builder.catalog().validate()?;

        let plan = phases
            .iter()
            .map(|&phase| self.builder.phase(phase).map(|s| (phase, s)))
            .collect::<Result<Vec<_>>>()?;

        let start = Instant::now();
        let mut report = RunReport::new();
        let mut aborted = false;

        for (phase, statements) in plan {
            tracing::info!(phase = %phase, statements = statements.len(), "starting phase");
            let phase_report = self
                .execute_phase(warehouse, phase, &statements, &mut aborted)
                .await;
            report.push(phase_report);
        }

        tracing::info!(
            attempted = report.attempted(),
            failed = report.failed(),
            skipped = report.skipped(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "run finished"
        );
        Ok(report)
    }

    async fn execute_phase(
        &self,
        warehouse: &mut dyn Warehouse,
        phase: Phase,
        statements: &[Statement],
        aborted: &mut bool,
    ) -> PhaseReport {
        let mut report = PhaseReport::new(phase);

        for statement in statements {
            if *aborted {
                tracing::debug!(table = %statement.target, "skipped after earlier failure");
                report.push(StatementOutcome::skipped(phase, &statement.target));
                continue;
            }

            tracing::info!("{}: {}", phase.command(), statement.target);
            tracing::debug!(table = %statement.target, sql = %statement.sql, "executing");

            let start = Instant::now();
            let result = warehouse.execute(&statement.sql).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(()) => {
                    tracing::info!(table = %statement.target, elapsed_ms, "succeeded");
                    report.push(StatementOutcome::succeeded(
                        phase,
                        &statement.target,
                        elapsed_ms,
                    ));
                }
                Err(e) => {
                    let message = e.to_string();
                    tracing::error!(
                        table = %statement.target,
                        phase = %phase,
                        elapsed_ms,
                        "{}",
                        Error::statement(&statement.target, &message)
                    );
                    report.push(StatementOutcome::failed(
                        phase,
                        &statement.target,
                        message,
                        elapsed_ms,
                    ));
                    if self.policy.stops_on_failure() {
                        *aborted = true;
                    }
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests;
