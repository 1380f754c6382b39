//! Steps shared by several strategy pipelines.

use std::collections::BTreeMap;

use crate::config::Config;
use crate::core::{CreateStrategy, Environment, EnvironmentTable};
use crate::error::TableError;
use crate::hive::definition::{
    TableDefinition, DISCOVER_PARTITIONS, DOWNGRADED_FROM_ACID, EXTERNAL_TABLE_PURGE,
};
use crate::hive::location::TableKind;
use crate::hive::statement as sql;
use crate::pipeline::{Plan, StageFlow, StageResult, TableJob};
use crate::strategy::context::DatabaseContext;
use crate::strategy::resolver::TableAction;

pub const MISSING_DDL_ERROR: &str =
    "No CREATE TABLE statement was discovered for the source table. Its definition is required to build the migration.";

pub const DYNAMIC_PARTITION_ISSUE: &str =
    "Partitioned data movement needs 'hive.exec.dynamic.partition.mode=nonstrict' in the session that runs it.";

/// First stage of every data-writing pipeline: apply the resolver's verdict
/// and make sure LEFT's DDL can be rewritten.
pub fn evaluate(job: &mut TableJob) -> StageResult {
    match &job.decision.action {
        TableAction::Reject { message, skipped } => {
            let name = job.table.name.clone();
            if *skipped {
                job.table
                    .env_mut(Environment::Right)
                    .add_sql(sql::SKIPPED_DESC, sql::skipped(&name));
            }
            Err(TableError::new(name, Environment::Right, message.clone()))
        }
        _ if job.table.left().table_definition().table_name().is_none() => Err(TableError::new(
            &job.table.name,
            Environment::Left,
            MISSING_DDL_ERROR,
        )),
        _ => Ok(StageFlow::Continue),
    }
}

/// Start a side's SQL with a USE statement.
pub fn select_db(table: &mut EnvironmentTable, db: &str) {
    if table.sql.is_empty() {
        table.add_sql(sql::USE_DESC, sql::use_db(db));
    }
}

pub fn select_db_cleanup(table: &mut EnvironmentTable, db: &str) {
    if table.cleanup_sql.is_empty() {
        table.add_cleanup_sql(sql::USE_DESC, sql::use_db(db));
    }
}

/// Open RIGHT's SQL: select the database and drop the table being replaced.
pub fn open_right(job: &mut TableJob, db: &str) {
    let name = job.table.name.clone();
    let right = job.table.env_mut(Environment::Right);
    if !right.sql.is_empty() {
        return;
    }
    select_db(right, db);
    if right.create_strategy == CreateStrategy::Replace {
        right.add_sql(sql::DROP_TABLE_DESC, sql::drop_table(&name));
    }
}

/// Whether the target copy of a LEFT table is EXTERNAL.
pub fn target_is_external(left: &EnvironmentTable, downgrade: bool) -> bool {
    !left.is_acid() || downgrade
}

pub fn table_kind(external: bool) -> TableKind {
    if external {
        TableKind::External
    } else {
        TableKind::Managed
    }
}

/// Properties every EXTERNAL target carries.
pub fn target_properties(partitioned: bool, downgrade: bool) -> BTreeMap<String, String> {
    let mut props = BTreeMap::new();
    props.insert(EXTERNAL_TABLE_PURGE.to_string(), "true".to_string());
    if partitioned {
        props.insert(DISCOVER_PARTITIONS.to_string(), "true".to_string());
    }
    if downgrade {
        props.insert(DOWNGRADED_FROM_ACID.to_string(), "true".to_string());
    }
    props
}

/// LEFT's definition rewritten for the target: ACID tables stay managed
/// unless downgraded, everything else becomes EXTERNAL. Managed targets lose
/// their LOCATION.
///
/// Returns the definition and the properties added to it.
pub fn target_definition(
    left: &EnvironmentTable,
    name: &str,
    downgrade: bool,
) -> (TableDefinition, BTreeMap<String, String>) {
    let mut def = left.table_definition();
    def.rename(name);

    if !target_is_external(left, downgrade) {
        def.remove_location();
        return (def, BTreeMap::new());
    }

    if def.is_acid() {
        def.strip_transactional();
    }
    def.make_external();
    let added = target_properties(left.partitioned, downgrade && left.is_acid());
    for (key, value) in &added {
        def.set_property(key, value);
    }
    (def, added)
}

/// Build the target definition into `plan` and record the added properties
/// on RIGHT.
pub fn build_target_definition(job: &mut TableJob, plan: &mut Plan) {
    let name = job.table.name.clone();
    let (def, added) = target_definition(job.table.left(), &name, job.decision.downgrade);
    job.table.env_mut(Environment::Right).add_properties = added;
    plan.target = Some(def);
}

/// Emit RIGHT's "Creating Table" for the planned target.
pub fn create_target(job: &mut TableJob, plan: &Plan, ctx: &DatabaseContext) -> StageResult {
    let def = plan.target.as_ref().ok_or_else(|| missing(job, "target definition"))?;
    open_right(job, &ctx.target_db);
    job.table
        .env_mut(Environment::Right)
        .add_sql(sql::CREATE_TABLE_DESC, def.sql());
    Ok(StageFlow::Continue)
}

/// Error for a stage that runs without the artifact an earlier stage plans.
pub fn missing(job: &TableJob, what: &str) -> TableError {
    TableError::new(
        &job.table.name,
        Environment::Right,
        format!("No {} was planned for {}", what, job.job_name()),
    )
}

/// Definition of a working table over `location`: same columns and
/// partitions as LEFT, never transactional, never owning its data.
pub fn working_definition(left: &EnvironmentTable, name: &str, location: &str) -> TableDefinition {
    let mut def = left.table_definition();
    def.rename(name);
    def.strip_transactional();
    def.make_external();
    def.set_location(location);
    def.set_property(EXTERNAL_TABLE_PURGE, "false");
    def
}

/// Reject tables with more partitions than `limit`.
pub fn check_partition_limit(job: &TableJob, limit: usize, key: &str) -> StageResult {
    let left = job.table.left();
    if left.partitioned && left.partition_count > limit {
        return Err(TableError::new(
            &job.table.name,
            Environment::Right,
            format!(
                "The number of partitions: {} exceeds the configuration limit ({}) of {}. \
                 This value is used to abort migrations that have a high potential for failure. \
                 Increase the limit or migrate the table manually.",
                left.partition_count, key, limit
            ),
        ));
    }
    Ok(StageFlow::Continue)
}

/// Session settings ahead of an INSERT OVERWRITE.
pub fn session_settings(table: &mut EnvironmentTable, config: &Config, partitioned: bool) {
    let optimization = &config.optimization;
    table.add_sql(
        sql::STATS_AUTOGATHER_DESC,
        sql::set_session(sql::STATS_AUTOGATHER, &optimization.auto_table_stats.to_string()),
    );
    if partitioned {
        table.add_sql(
            sql::SORT_DYNAMIC_PARTITION_DESC,
            sql::set_session(
                sql::SORT_DYNAMIC_PARTITION,
                &optimization.sort_dynamic_partition_inserts.to_string(),
            ),
        );
    }
}

/// Copy all rows of `from` into `to`, distributing on the partition columns.
pub fn move_data(table: &mut EnvironmentTable, from: &str, to: &str, partition_columns: &[String]) {
    if partition_columns.is_empty() {
        table.add_sql(sql::MOVE_DATA_DESC, sql::insert_overwrite(from, to, &[]));
    } else {
        table.add_sql(
            sql::MOVE_PARTITIONED_DESC,
            sql::insert_overwrite(from, to, partition_columns),
        );
        table.add_issue(DYNAMIC_PARTITION_ISSUE);
    }
}
