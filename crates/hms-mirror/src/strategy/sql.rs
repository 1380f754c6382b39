//! SQL data movement through working tables.
//!
//! LEFT copies the source into a TRANSFER table when the source is ACID or
//! when staging goes through shared storage. RIGHT reads the data through a
//! SHADOW table (over the transfer path, or directly over LEFT's location),
//! then fills the final table with INSERT OVERWRITE. Both working tables are
//! dropped by the cleanup scripts.

use crate::config::DataStrategy;
use crate::core::{CreateStrategy, Environment, EnvironmentTable};
use crate::hive::definition::{
    TableDefinition, DOWNGRADED_FROM_ACID, EXTERNAL_TABLE_PURGE, SHADOW_TABLE_MARKER,
};
use crate::hive::statement as sql;
use crate::pipeline::{Plan, Stage, StageFlow, StageResult, TableJob, TablePipeline};
use crate::strategy::context::DatabaseContext;
use crate::strategy::shared::{
    build_target_definition, check_partition_limit, create_target, evaluate, missing, move_data,
    open_right, select_db, select_db_cleanup, session_settings, table_kind, target_is_external,
    working_definition, DYNAMIC_PARTITION_ISSUE,
};

const STAGES: &[Stage] = &[
    Stage::Evaluate,
    Stage::PartitionLimit,
    Stage::ResolveWorkingPaths,
    Stage::TransferDefinition,
    Stage::ShadowDefinition,
    Stage::BuildTargetDefinition,
    Stage::TranslateLocations,
    Stage::TransferSql,
    Stage::ShadowSql,
    Stage::BuildTargetSql,
    Stage::DataMovement,
    Stage::Cleanup,
];

const WORKING_PROPERTIES: &[&str] = &[EXTERNAL_TABLE_PURGE, SHADOW_TABLE_MARKER, DOWNGRADED_FROM_ACID];

pub const SQL_PARTITION_LIMIT_KEY: &str = "hybrid.sql_partition_limit";
pub const ACID_PARTITION_LIMIT_KEY: &str = "migrate_acid.partition_limit";

/// Pipeline for the SQL and ACID strategies.
pub struct SqlPipeline;

impl TablePipeline for SqlPipeline {
    fn name(&self) -> &'static str {
        "sql"
    }

    fn stages(&self) -> &'static [Stage] {
        STAGES
    }

    fn execute(&self, stage: Stage, job: &mut TableJob, plan: &mut Plan, ctx: &DatabaseContext) -> StageResult {
        match stage {
            Stage::Evaluate => evaluate(job),
            Stage::PartitionLimit => {
                let config = &ctx.config;
                if job.decision.strategy == DataStrategy::Acid {
                    check_partition_limit(job, config.migrate_acid.partition_limit, ACID_PARTITION_LIMIT_KEY)
                } else {
                    check_partition_limit(job, config.hybrid.sql_partition_limit, SQL_PARTITION_LIMIT_KEY)
                }
            }
            Stage::ResolveWorkingPaths => {
                let left = job.table.left();
                if left.is_acid() || ctx.uses_shared_storage() {
                    plan.working_path = Some(ctx.working_path(&job.table.name, left.location.as_deref()));
                }
                Ok(StageFlow::Continue)
            }
            Stage::TransferDefinition => {
                if let Some(path) = plan.working_path.clone() {
                    let name = ctx.transfer_name(&job.table.name);
                    let def = working_definition(job.table.left(), &name, &path);
                    record_working_table(job, Environment::Transfer, &name, &def, &path);
                    plan.transfer = Some(def);
                }
                Ok(StageFlow::Continue)
            }
            Stage::ShadowDefinition => {
                let path = plan
                    .working_path
                    .clone()
                    .or_else(|| job.table.left().location.clone())
                    .ok_or_else(|| missing(job, "source location"))?;
                let name = ctx.shadow_name(&job.table.name);
                let mut def = working_definition(job.table.left(), &name, &path);
                def.set_property(SHADOW_TABLE_MARKER, "true");
                if job.decision.downgrade {
                    def.set_property(DOWNGRADED_FROM_ACID, "true");
                }
                record_working_table(job, Environment::Shadow, &name, &def, &path);
                plan.shadow = Some(def);
                Ok(StageFlow::Continue)
            }
            Stage::BuildTargetDefinition => {
                build_target_definition(job, plan);
                Ok(StageFlow::Continue)
            }
            Stage::TranslateLocations => {
                let left = job.table.left();
                let external = target_is_external(left, job.decision.downgrade);
                if external {
                    let location = ctx.translator.table_location(
                        left.location.as_deref(),
                        &job.table.name,
                        table_kind(external),
                    );
                    let def = plan.target.as_mut().ok_or_else(|| missing(job, "target definition"))?;
                    if let Some(location) = &location {
                        def.set_location(location);
                    }
                    job.table.env_mut(Environment::Right).location = location.clone();
                    plan.target_location = location;
                }
                Ok(StageFlow::Continue)
            }
            Stage::TransferSql => {
                if let Some(def) = &plan.transfer {
                    transfer_sql(job, def, ctx);
                }
                Ok(StageFlow::Continue)
            }
            Stage::ShadowSql => {
                let def = plan.shadow.as_ref().ok_or_else(|| missing(job, "shadow definition"))?;
                let shadow = ctx.shadow_name(&job.table.name);
                open_right(job, &ctx.target_db);
                let partitioned = job.table.left().partitioned;
                let right = job.table.env_mut(Environment::Right);
                right.add_sql(sql::CREATE_SHADOW_TABLE_DESC, def.sql());
                if partitioned {
                    right.add_sql(sql::MSCK_REPAIR_DESC, sql::msck_repair(&shadow));
                }
                Ok(StageFlow::Continue)
            }
            Stage::BuildTargetSql => create_target(job, plan, ctx),
            Stage::DataMovement => {
                let name = job.table.name.clone();
                let shadow = ctx.shadow_name(&name);
                let left = job.table.left();
                let partitioned = left.partitioned;
                let columns = left.table_definition().partition_columns();
                let right = job.table.env_mut(Environment::Right);
                session_settings(right, &ctx.config, partitioned);
                move_data(right, &shadow, &name, &columns);
                Ok(StageFlow::Continue)
            }
            Stage::Cleanup => {
                let name = job.table.name.clone();
                let right = job.table.env_mut(Environment::Right);
                select_db_cleanup(right, &ctx.target_db);
                right.add_cleanup_sql(sql::DROP_SHADOW_TABLE_DESC, sql::drop_table(&ctx.shadow_name(&name)));

                if plan.transfer.is_some() {
                    let left = job.table.env_mut(Environment::Left);
                    select_db_cleanup(left, &ctx.source_db);
                    left.add_cleanup_sql(
                        sql::DROP_TRANSFER_TABLE_DESC,
                        sql::drop_table(&ctx.transfer_name(&name)),
                    );
                }
                Ok(StageFlow::Continue)
            }
            _ => Ok(StageFlow::Continue),
        }
    }
}

/// LEFT: create the transfer table and copy the source into it.
fn transfer_sql(job: &mut TableJob, def: &TableDefinition, ctx: &DatabaseContext) {
    let name = job.table.name.clone();
    let transfer = ctx.transfer_name(&name);
    let columns = job.table.left().table_definition().partition_columns();
    let partitioned = !columns.is_empty();

    let left = job.table.env_mut(Environment::Left);
    select_db(left, &ctx.source_db);
    left.add_sql(sql::CREATE_TRANSFER_TABLE_DESC, def.sql());
    session_settings(left, &ctx.config, partitioned);
    left.add_sql(sql::MOVE_TRANSFER_DESC, sql::insert_overwrite(&name, &transfer, &columns));
    if partitioned {
        left.add_issue(DYNAMIC_PARTITION_ISSUE);
    }
}

fn record_working_table(job: &mut TableJob, env: Environment, name: &str, def: &TableDefinition, location: &str) {
    let partitioned = job.table.left().partitioned;
    let mut table = EnvironmentTable {
        name: name.to_string(),
        definition: def.lines().to_vec(),
        location: Some(location.to_string()),
        partitioned,
        create_strategy: CreateStrategy::Create,
        ..Default::default()
    };
    table.add_properties = def
        .properties()
        .into_iter()
        .filter(|(key, _)| WORKING_PROPERTIES.contains(&key.as_str()))
        .collect();
    *job.table.env_mut(env) = table;
}
