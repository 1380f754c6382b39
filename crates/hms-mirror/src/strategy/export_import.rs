use crate::core::Environment;
use crate::hive::location::TableKind;
use crate::hive::statement as sql;
use crate::pipeline::{Plan, Stage, StageFlow, StageResult, TableJob, TablePipeline};
use crate::strategy::context::DatabaseContext;
use crate::strategy::shared::{
    check_partition_limit, evaluate, missing, open_right, select_db, target_is_external,
    target_properties,
};

const STAGES: &[Stage] = &[
    Stage::Evaluate,
    Stage::ResolveWorkingPaths,
    Stage::ExportSql,
    Stage::PartitionLimit,
    Stage::TranslateLocations,
    Stage::ImportSql,
];

pub const PARTITION_LIMIT_KEY: &str = "hybrid.export_import_partition_limit";

/// EXPORT on LEFT into a working path, IMPORT from it on RIGHT.
pub struct ExportImportPipeline;

impl TablePipeline for ExportImportPipeline {
    fn name(&self) -> &'static str {
        "export-import"
    }

    fn stages(&self) -> &'static [Stage] {
        STAGES
    }

    fn execute(&self, stage: Stage, job: &mut TableJob, plan: &mut Plan, ctx: &DatabaseContext) -> StageResult {
        match stage {
            Stage::Evaluate => evaluate(job),
            Stage::ResolveWorkingPaths => {
                let left = job.table.left();
                plan.working_path = Some(ctx.working_path(&job.table.name, left.location.as_deref()));
                Ok(StageFlow::Continue)
            }
            Stage::ExportSql => {
                let path = plan.working_path.clone().ok_or_else(|| missing(job, "working path"))?;
                let name = job.table.name.clone();
                let left = job.table.env_mut(Environment::Left);
                select_db(left, &ctx.source_db);
                left.add_sql(sql::EXPORT_TABLE_DESC, sql::export_table(&name, &path));
                Ok(StageFlow::Continue)
            }
            Stage::PartitionLimit => check_partition_limit(
                job,
                ctx.config.hybrid.export_import_partition_limit,
                PARTITION_LIMIT_KEY,
            ),
            Stage::TranslateLocations => {
                let left = job.table.left();
                if target_is_external(left, job.decision.downgrade) {
                    let location = ctx.translator.table_location(
                        left.location.as_deref(),
                        &job.table.name,
                        TableKind::External,
                    );
                    job.table.env_mut(Environment::Right).location = location.clone();
                    plan.target_location = location;
                }
                Ok(StageFlow::Continue)
            }
            Stage::ImportSql => import_sql(job, plan, ctx),
            _ => Ok(StageFlow::Continue),
        }
    }
}

fn import_sql(job: &mut TableJob, plan: &Plan, ctx: &DatabaseContext) -> StageResult {
    let path = plan.working_path.clone().ok_or_else(|| missing(job, "working path"))?;
    let name = job.table.name.clone();
    let external = target_is_external(job.table.left(), job.decision.downgrade);
    if !external {
        open_right(job, &ctx.target_db);
        job.table
            .env_mut(Environment::Right)
            .add_sql(sql::IMPORT_TABLE_DESC, sql::import_table(&name, &path));
        return Ok(StageFlow::Continue);
    }

    let location = plan
        .target_location
        .clone()
        .ok_or_else(|| missing(job, "target location"))?;
    let left = job.table.left();
    let props = target_properties(left.partitioned, job.decision.downgrade && left.is_acid());

    open_right(job, &ctx.target_db);
    let right = job.table.env_mut(Environment::Right);
    right.add_sql(
        sql::IMPORT_TABLE_DESC,
        sql::import_external_table(&name, &path, &location),
    );
    for (key, value) in &props {
        right.add_sql(sql::SET_TABLE_PROPERTY_DESC, sql::set_table_property(&name, key, value));
    }
    right.add_properties = props;
    Ok(StageFlow::Continue)
}
