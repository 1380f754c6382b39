//! Template Method pattern for table pipelines.
//!
//! The [`TablePipeline`] trait fixes the skeleton every strategy follows:
//! start the table, run the stages in order counting one phase each, stop on
//! the first error or early finish, and end in the strategy's terminal state.
//! Strategies only supply their stage list and what each stage does.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::job::TableJob;
use super::stage::{Plan, Stage, StageFlow, StageResult};
use crate::core::PhaseState;
use crate::strategy::context::DatabaseContext;

/// Thread-safe progress counters shared by the table workers.
#[derive(Debug)]
pub struct ProgressTracker {
    pub tables_total: AtomicU64,
    pub tables_completed: AtomicU64,
    pub tables_failed: AtomicU64,
    pub active_workers: AtomicU64,
    start_time: Instant,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ProgressTracker {
    pub fn new(total: u64) -> Self {
        Self {
            tables_total: AtomicU64::new(total),
            tables_completed: AtomicU64::new(0),
            tables_failed: AtomicU64::new(0),
            active_workers: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn worker_started(&self) {
        self.active_workers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn worker_finished(&self) {
        self.active_workers.fetch_sub(1, Ordering::Relaxed);
    }

    /// Count a finished table; returns the number finished so far.
    pub fn table_finished(&self, failed: bool) -> u64 {
        if failed {
            self.tables_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.tables_completed.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get_total(&self) -> u64 {
        self.tables_total.load(Ordering::Relaxed)
    }

    pub fn get_completed(&self) -> u64 {
        self.tables_completed.load(Ordering::Relaxed)
    }

    pub fn get_failed(&self) -> u64 {
        self.tables_failed.load(Ordering::Relaxed)
    }

    pub fn get_active_workers(&self) -> u64 {
        self.active_workers.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Template Method trait for table pipelines.
///
/// # Algorithm Steps
///
/// 1. **Start**: the table enters `STARTED` with `total_phase_count` set to
///    the number of stages
/// 2. **Stages**: each stage increments `current_phase` and runs; an error
///    records it on its side and ends in `ERROR`, an early finish ends in the
///    state it names
/// 3. **Finish**: after the last stage the table takes
///    [`terminal_state`](TablePipeline::terminal_state)
///
/// Cancellation is checked before each stage. A cancelled table keeps the
/// phase it last recorded.
#[async_trait]
pub trait TablePipeline: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Stages in execution order.
    fn stages(&self) -> &'static [Stage];

    /// Run one stage.
    fn execute(
        &self,
        stage: Stage,
        job: &mut TableJob,
        plan: &mut Plan,
        ctx: &DatabaseContext,
    ) -> StageResult;

    /// State reached when every stage ran.
    fn terminal_state(&self) -> PhaseState {
        PhaseState::CalculatedSql
    }

    /// Run the complete pipeline for one table.
    async fn run(&self, job: &mut TableJob, ctx: &DatabaseContext, cancel: &CancellationToken) {
        let start = Instant::now();
        let stages = self.stages();
        if !job.table.start(stages.len()) {
            return;
        }

        let mut plan = Plan::default();
        let mut finished = false;
        for &stage in stages {
            if cancel.is_cancelled() {
                debug!(
                    "{}: cancelled before {} (phase {}/{})",
                    job.job_name(),
                    stage,
                    job.table.current_phase,
                    job.table.total_phase_count
                );
                break;
            }
            job.table.enter_phase();
            debug!(
                "{}: [{}] phase {}/{}: {}",
                job.job_name(),
                self.name(),
                job.table.current_phase,
                job.table.total_phase_count,
                stage
            );

            match self.execute(stage, job, &mut plan, ctx) {
                Ok(StageFlow::Continue) => {}
                Ok(StageFlow::Done(state)) => {
                    job.table.finish(state);
                    finished = true;
                    break;
                }
                Err(error) => {
                    warn!("{}: {} failed: {}", job.job_name(), stage, error);
                    job.table.fail(error);
                    finished = true;
                    break;
                }
            }
            tokio::task::yield_now().await;
        }

        if !finished && job.table.current_phase == stages.len() {
            job.table.finish(self.terminal_state());
        }
        job.table.stage_duration = start.elapsed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, DataStrategy};
    use crate::core::{CreateStrategy, Environment, EnvironmentTable, TableMirror};
    use crate::error::TableError;
    use crate::strategy::resolver::{Decision, TableAction};
    use std::sync::Arc;

    struct Scripted {
        fail_at: Option<Stage>,
        stop_at: Option<Stage>,
    }

    const SCRIPT: &[Stage] = &[Stage::Evaluate, Stage::BuildTargetSql, Stage::Finalize];

    impl TablePipeline for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn stages(&self) -> &'static [Stage] {
            SCRIPT
        }

        fn execute(&self, stage: Stage, job: &mut TableJob, _plan: &mut Plan, _ctx: &DatabaseContext) -> StageResult {
            if self.fail_at == Some(stage) {
                return Err(TableError::new(&job.table.name, Environment::Right, "stage failed"));
            }
            if self.stop_at == Some(stage) {
                return Ok(StageFlow::Done(PhaseState::Processed));
            }
            job.table.add_issue(Environment::Left, stage.label());
            Ok(StageFlow::Continue)
        }
    }

    fn job() -> TableJob {
        let table = TableMirror::new("t", EnvironmentTable::named("t"), EnvironmentTable::named("t"));
        let decision = Decision {
            strategy: DataStrategy::SchemaOnly,
            action: TableAction::Migrate,
            right_create: CreateStrategy::Create,
            downgrade: false,
        };
        TableJob::new("db", table, decision)
    }

    fn ctx() -> DatabaseContext {
        DatabaseContext::new(Arc::new(Config::default()), "db", None)
    }

    #[tokio::test]
    async fn test_runs_all_stages_to_terminal_state() {
        let mut job = job();
        let pipeline = Scripted { fail_at: None, stop_at: None };
        pipeline.run(&mut job, &ctx(), &CancellationToken::new()).await;
        assert_eq!(job.table.phase_state, PhaseState::CalculatedSql);
        assert_eq!(job.table.current_phase, 3);
        assert_eq!(job.table.total_phase_count, 3);
        assert_eq!(job.table.left().issues.len(), 3);
    }

    #[tokio::test]
    async fn test_error_stops_pipeline() {
        let mut job = job();
        let pipeline = Scripted { fail_at: Some(Stage::BuildTargetSql), stop_at: None };
        pipeline.run(&mut job, &ctx(), &CancellationToken::new()).await;
        assert_eq!(job.table.phase_state, PhaseState::Error);
        assert_eq!(job.table.current_phase, 2);
        assert_eq!(job.table.right().errors, vec!["stage failed"]);
        assert_eq!(job.table.left().issues, vec!["evaluate"]);
    }

    #[tokio::test]
    async fn test_early_finish() {
        let mut job = job();
        let pipeline = Scripted { fail_at: None, stop_at: Some(Stage::Evaluate) };
        pipeline.run(&mut job, &ctx(), &CancellationToken::new()).await;
        assert_eq!(job.table.phase_state, PhaseState::Processed);
        assert_eq!(job.table.current_phase, 1);
    }

    #[tokio::test]
    async fn test_cancelled_pipeline_keeps_last_phase() {
        let mut job = job();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let pipeline = Scripted { fail_at: None, stop_at: None };
        pipeline.run(&mut job, &ctx(), &cancel).await;
        assert_eq!(job.table.phase_state, PhaseState::Started);
        assert_eq!(job.table.current_phase, 0);
    }

    #[tokio::test]
    async fn test_terminal_table_is_not_rerun() {
        let mut job = job();
        let pipeline = Scripted { fail_at: None, stop_at: None };
        pipeline.run(&mut job, &ctx(), &CancellationToken::new()).await;
        pipeline.run(&mut job, &ctx(), &CancellationToken::new()).await;
        assert_eq!(job.table.current_phase, 3);
        assert_eq!(job.table.left().issues.len(), 3);
    }

    #[test]
    fn test_progress_tracker() {
        let tracker = ProgressTracker::new(3);
        tracker.worker_started();
        tracker.worker_started();
        assert_eq!(tracker.get_active_workers(), 2);
        tracker.worker_finished();
        assert_eq!(tracker.table_finished(false), 1);
        assert_eq!(tracker.table_finished(true), 2);
        assert_eq!(tracker.get_failed(), 1);
        assert_eq!(tracker.get_total(), 3);
    }
}
