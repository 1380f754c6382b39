use crate::core::{Environment, PhaseState};
use crate::hive::statement as sql;
use crate::pipeline::{Plan, Stage, StageFlow, StageResult, TableJob, TablePipeline};
use crate::strategy::context::DatabaseContext;
use crate::strategy::resolver::{TableAction, SCHEMA_EXISTS_MATCHES, SCHEMA_EXISTS_TARGET_ONLY};
use crate::strategy::shared::select_db;

pub const SOURCE_MISSING_ISSUE: &str = "Table doesn't exist on the source. Nothing to do.";

const STAGES: &[Stage] = &[Stage::Evaluate, Stage::Finalize];

/// Tables needing no DDL: RIGHT already matches LEFT, or the table only
/// exists on RIGHT.
pub struct NoOpPipeline;

impl TablePipeline for NoOpPipeline {
    fn name(&self) -> &'static str {
        "no-op"
    }

    fn stages(&self) -> &'static [Stage] {
        STAGES
    }

    fn terminal_state(&self) -> PhaseState {
        PhaseState::Processed
    }

    fn execute(&self, stage: Stage, job: &mut TableJob, _plan: &mut Plan, ctx: &DatabaseContext) -> StageResult {
        match stage {
            Stage::Evaluate => {
                let (env, issue) = match job.decision.action {
                    // LEFT-only strategies never look at RIGHT
                    TableAction::Orphan if !job.decision.strategy.writes_right() => {
                        (Environment::Left, SOURCE_MISSING_ISSUE)
                    }
                    TableAction::Orphan => (Environment::Right, SCHEMA_EXISTS_TARGET_ONLY),
                    _ => (Environment::Right, SCHEMA_EXISTS_MATCHES),
                };
                job.table.add_issue(env, issue);
            }
            Stage::Finalize => {
                let config = &ctx.config;
                let removes = job.decision.action == TableAction::Orphan
                    && config.sync
                    && !config.read_only
                    && job.decision.strategy.writes_right();
                if removes {
                    let name = job.table.name.clone();
                    let right = job.table.env_mut(Environment::Right);
                    select_db(right, &ctx.target_db);
                    right.add_sql(sql::REMOVE_TABLE_DESC, sql::drop_table(&name));
                }
            }
            _ => {}
        }
        Ok(StageFlow::Continue)
    }
}
