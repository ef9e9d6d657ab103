//! Pipeline types
//!
//! Per-statement outcomes and the phase/run reports built from them.

use crate::error::{Error, Result};
use crate::types::Phase;
use serde::Serialize;

/// What happened to a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Succeeded,
    Failed,
    /// Not attempted because an earlier statement failed under fail-fast
    Skipped,
}

/// Result of one statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementOutcome {
    pub phase: Phase,
    pub target: String,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl StatementOutcome {
    pub fn succeeded(phase: Phase, target: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            phase,
            target: target.into(),
            status: OutcomeStatus::Succeeded,
            error: None,
            elapsed_ms,
        }
    }

    pub fn failed(
        phase: Phase,
        target: impl Into<String>,
        error: impl Into<String>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            phase,
            target: target.into(),
            status: OutcomeStatus::Failed,
            error: Some(error.into()),
            elapsed_ms,
        }
    }

    pub fn skipped(phase: Phase, target: impl Into<String>) -> Self {
        Self {
            phase,
            target: target.into(),
            status: OutcomeStatus::Skipped,
            error: None,
            elapsed_ms: 0,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == OutcomeStatus::Failed
    }
}

/// Outcomes of one phase, in execution order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseReport {
    pub phase: Phase,
    pub outcomes: Vec<StatementOutcome>,
}

impl PhaseReport {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            outcomes: Vec::new(),
        }
    }

    pub fn push(&mut self, outcome: StatementOutcome) {
        self.outcomes.push(outcome);
    }

    fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Statements that were executed (successfully or not)
    pub fn attempted(&self) -> usize {
        self.outcomes.len() - self.skipped()
    }

    pub fn succeeded(&self) -> usize {
        self.count(OutcomeStatus::Succeeded)
    }

    pub fn failed(&self) -> usize {
        self.count(OutcomeStatus::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(OutcomeStatus::Skipped)
    }
}

/// Outcomes of a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub phases: Vec<PhaseReport>,
}

/// Compact summary printed at the end of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary<'a> {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failures: Vec<&'a StatementOutcome>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, phase: PhaseReport) {
        self.phases.push(phase);
    }

    pub fn phase(&self, phase: Phase) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.phase == phase)
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &StatementOutcome> {
        self.phases.iter().flat_map(|p| p.outcomes.iter())
    }

    pub fn failures(&self) -> impl Iterator<Item = &StatementOutcome> {
        self.outcomes().filter(|o| o.is_failed())
    }

    pub fn attempted(&self) -> usize {
        self.phases.iter().map(PhaseReport::attempted).sum()
    }

    pub fn failed(&self) -> usize {
        self.phases.iter().map(PhaseReport::failed).sum()
    }

    pub fn skipped(&self) -> usize {
        self.phases.iter().map(PhaseReport::skipped).sum()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn summary(&self) -> RunSummary<'_> {
        RunSummary {
            attempted: self.attempted(),
            succeeded: self.phases.iter().map(PhaseReport::succeeded).sum(),
            failed: self.failed(),
            skipped: self.skipped(),
            failures: self.failures().collect(),
        }
    }

    /// `Ok(self)` if every attempted statement succeeded
    pub fn into_result(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::PipelineFailed {
                failed: self.failed(),
                attempted: self.attempted(),
            })
        }
    }
}
