//! Table job (Command pattern): everything needed to plan one table.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::{PhaseState, TableMirror};
use crate::strategy::resolver::Decision;

/// A table together with the decision taken for it.
///
/// Jobs are self-contained, so they can be moved into a worker task and
/// handed back when the pipeline is done.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableJob {
    pub database: String,
    pub table: TableMirror,
    pub decision: Decision,
}

impl TableJob {
    pub fn new(database: impl Into<String>, mut table: TableMirror, decision: Decision) -> Self {
        table.strategy = Some(decision.strategy);
        table.environments.right.create_strategy = decision.right_create;
        Self {
            database: database.into(),
            table,
            decision,
        }
    }

    /// `database.table`, for logging.
    pub fn job_name(&self) -> String {
        format!("{}.{}", self.database, self.table.name)
    }

    pub fn into_result(self) -> JobResult {
        JobResult {
            database: self.database,
            phase_state: self.table.phase_state,
            current_phase: self.table.current_phase,
            total_phase_count: self.table.total_phase_count,
            duration: self.table.stage_duration,
            table: self.table,
        }
    }
}

/// Outcome of a table job.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub database: String,
    pub table: TableMirror,
    pub phase_state: PhaseState,
    pub current_phase: usize,
    pub total_phase_count: usize,
    pub duration: Duration,
}

impl JobResult {
    pub fn failed(&self) -> bool {
        self.phase_state == PhaseState::Error
    }
}
