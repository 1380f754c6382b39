use crate::core::{Environment, PhaseState};
use crate::hive::definition::DOWNGRADED_FROM_ACID;
use crate::hive::location::TableKind;
use crate::hive::statement as sql;
use crate::pipeline::{Plan, Stage, StageFlow, StageResult, TableJob, TablePipeline};
use crate::strategy::context::DatabaseContext;
use crate::strategy::shared::{
    evaluate, missing, move_data, select_db, select_db_cleanup, session_settings,
};

const STAGES: &[Stage] = &[
    Stage::Evaluate,
    Stage::BuildSourceDefinition,
    Stage::TranslateLocations,
    Stage::BuildSourceSql,
    Stage::DataMovement,
    Stage::Cleanup,
];

pub const ALREADY_MIGRATED_ISSUE: &str =
    "Table is already stored at the target location. No migration required.";

/// Move a table's data to new storage on LEFT: archive the original under a
/// new name, recreate it at the new location, and copy the rows across.
pub struct StorageMigrationPipeline;

impl TablePipeline for StorageMigrationPipeline {
    fn name(&self) -> &'static str {
        "storage-migration"
    }

    fn stages(&self) -> &'static [Stage] {
        STAGES
    }

    fn execute(&self, stage: Stage, job: &mut TableJob, plan: &mut Plan, ctx: &DatabaseContext) -> StageResult {
        match stage {
            Stage::Evaluate => evaluate(job),
            Stage::BuildSourceDefinition => {
                let mut def = job.table.left().table_definition();
                if job.decision.downgrade {
                    def.strip_transactional();
                    def.make_external();
                    def.set_property(DOWNGRADED_FROM_ACID, "true");
                    job.table
                        .env_mut(Environment::Left)
                        .add_properties
                        .insert(DOWNGRADED_FROM_ACID.to_string(), "true".to_string());
                }
                plan.target = Some(def);
                Ok(StageFlow::Continue)
            }
            Stage::TranslateLocations => {
                let kind = match plan.target.as_ref().map(|d| d.is_external()) {
                    Some(true) => TableKind::External,
                    Some(false) => TableKind::Managed,
                    None => return Err(missing(job, "source definition")),
                };
                let current = job.table.left().location.clone();
                let location = ctx
                    .translator
                    .table_location(current.as_deref(), &job.table.name, kind)
                    .ok_or_else(|| missing(job, "target location"))?;
                if current.as_deref() == Some(location.as_str()) {
                    job.table.add_issue(Environment::Left, ALREADY_MIGRATED_ISSUE);
                    return Ok(StageFlow::Done(PhaseState::Processed));
                }
                if let Some(def) = plan.target.as_mut() {
                    def.set_location(&location);
                }
                plan.target_location = Some(location);
                Ok(StageFlow::Continue)
            }
            Stage::BuildSourceSql => {
                let def = plan.target.as_ref().ok_or_else(|| missing(job, "source definition"))?;
                let name = job.table.name.clone();
                let archive = ctx.archive_name(&name);
                let left = job.table.env_mut(Environment::Left);
                select_db(left, &ctx.source_db);
                left.add_sql(sql::RENAME_TABLE_DESC, sql::rename_table(&name, &archive));
                left.add_sql(sql::CREATE_TABLE_DESC, def.sql());
                Ok(StageFlow::Continue)
            }
            Stage::DataMovement => {
                let name = job.table.name.clone();
                let archive = ctx.archive_name(&name);
                let left = job.table.env_mut(Environment::Left);
                let partitioned = left.partitioned;
                let columns = left.table_definition().partition_columns();
                session_settings(left, &ctx.config, partitioned);
                move_data(left, &archive, &name, &columns);
                Ok(StageFlow::Continue)
            }
            Stage::Cleanup => {
                let archive = ctx.archive_name(&job.table.name);
                let left = job.table.env_mut(Environment::Left);
                left.add_issue(format!(
                    "The original table was renamed to {}. Drop it once the migrated data has been verified.",
                    archive
                ));
                select_db_cleanup(left, &ctx.source_db);
                left.add_cleanup_sql(sql::DROP_TABLE_DESC, sql::drop_table(&archive));
                Ok(StageFlow::Continue)
            }
            _ => Ok(StageFlow::Continue),
        }
    }
}
