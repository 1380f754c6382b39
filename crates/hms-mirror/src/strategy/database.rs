//! Database-level DDL: creating the database and pointing its locations.

use tracing::debug;

use crate::config::DataStrategy;
use crate::core::{DBMirror, DatabaseEnvironment, Environment};
use crate::hive::location::TableKind;
use crate::hive::statement as sql;
use crate::strategy::context::DatabaseContext;

pub const READ_ONLY_MISSING_DB_ISSUE: &str =
    "Database doesn't exist on the target and can't be created while the target is read-only.";

/// Generate the database statements for `db` and record the planned
/// locations. LEFT's discovered locations must already be in `db.locations`.
pub fn build_database_sql(db: &mut DBMirror, ctx: &DatabaseContext) {
    let config = &ctx.config;
    let left = db.locations.get(&Environment::Left).cloned().unwrap_or_default();

    match config.data_strategy {
        DataStrategy::Dump => {
            let planned = DatabaseEnvironment {
                exists: left.exists,
                location: left.location.clone(),
                managed_location: left.managed_location.clone(),
            };
            emit(db, Environment::Left, &ctx.source_db, &planned, true);
        }
        DataStrategy::StorageMigration => {
            let planned = DatabaseEnvironment {
                exists: left.exists,
                location: moved(ctx, left.location.as_deref(), TableKind::External),
                managed_location: moved(ctx, left.managed_location.as_deref(), TableKind::Managed),
            };
            let changed = DatabaseEnvironment {
                exists: left.exists,
                location: planned.location.clone().filter(|l| Some(l) != left.location.as_ref()),
                managed_location: planned
                    .managed_location
                    .clone()
                    .filter(|l| Some(l) != left.managed_location.as_ref()),
            };
            emit(db, Environment::Left, &ctx.source_db, &changed, false);
            db.locations.insert(Environment::Left, planned);
        }
        _ if config.read_only => {
            let right_exists = db
                .locations
                .get(&Environment::Right)
                .is_some_and(|r| r.exists);
            if !right_exists {
                db.add_issue(Environment::Right, READ_ONLY_MISSING_DB_ISSUE);
            }
        }
        strategy => {
            let right_exists = db
                .locations
                .get(&Environment::Right)
                .is_some_and(|r| r.exists);
            let planned = if strategy == DataStrategy::Common {
                DatabaseEnvironment {
                    exists: right_exists,
                    location: left.location.clone(),
                    managed_location: left.managed_location.clone(),
                }
            } else {
                DatabaseEnvironment {
                    exists: right_exists,
                    location: ctx
                        .translator
                        .database_location(left.location.as_deref(), TableKind::External),
                    managed_location: ctx
                        .translator
                        .database_location(left.managed_location.as_deref(), TableKind::Managed),
                }
            };
            emit(db, Environment::Right, &ctx.target_db, &planned, true);
            db.locations.insert(Environment::Right, planned);
        }
    }
    debug!(
        "{}: {} database statements",
        db.name,
        db.sql.values().map(Vec::len).sum::<usize>()
    );
}

fn moved(ctx: &DatabaseContext, original: Option<&str>, kind: TableKind) -> Option<String> {
    ctx.translator.database_location(original, kind)
}

fn emit(db: &mut DBMirror, env: Environment, name: &str, planned: &DatabaseEnvironment, create: bool) {
    if create {
        db.add_sql(env, sql::CREATE_DATABASE_DESC, sql::create_database(name));
    }
    if let Some(location) = &planned.location {
        db.add_sql(env, sql::ALTER_DB_LOCATION_DESC, sql::alter_db_location(name, location));
    }
    if let Some(location) = &planned.managed_location {
        db.add_sql(
            env,
            sql::ALTER_DB_MNGD_LOCATION_DESC,
            sql::alter_db_managed_location(name, location),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::hive::Warehouse;
    use std::sync::Arc;

    fn db_with_left(location: &str) -> DBMirror {
        let mut db = DBMirror::new("assorted_test_db", "assorted_test_db");
        db.locations.insert(
            Environment::Left,
            DatabaseEnvironment {
                exists: true,
                location: Some(location.to_string()),
                managed_location: None,
            },
        );
        db
    }

    fn config(strategy: DataStrategy) -> Config {
        let mut config = Config {
            data_strategy: strategy,
            ..Default::default()
        };
        config.clusters.left.hcfs_namespace = Some("hdfs://HDP50".into());
        config.clusters.right.hcfs_namespace = Some("hdfs://HOME90".into());
        config
    }

    fn build(config: Config, db: &mut DBMirror) {
        let ctx = DatabaseContext::new(Arc::new(config), &db.name.clone(), None);
        build_database_sql(db, &ctx);
    }

    #[test]
    fn test_schema_only_translates_database_location() {
        let mut db = db_with_left("hdfs://HDP50/apps/hive/warehouse/assorted_test_db.db");
        build(config(DataStrategy::SchemaOnly), &mut db);
        let right = db.sql_for(Environment::Right);
        assert_eq!(right[0].action, "CREATE DATABASE IF NOT EXISTS assorted_test_db\n");
        assert_eq!(
            right[1].action,
            "ALTER DATABASE assorted_test_db SET LOCATION \"hdfs://HOME90/apps/hive/warehouse/assorted_test_db.db\""
        );
        assert!(db.sql_for(Environment::Left).is_empty());
    }

    #[test]
    fn test_common_pins_left_location() {
        let mut db = db_with_left("hdfs://HDP50/apps/hive/warehouse/assorted_test_db.db");
        build(config(DataStrategy::Common), &mut db);
        assert_eq!(
            db.location(Environment::Right).and_then(|l| l.location.as_deref()),
            Some("hdfs://HDP50/apps/hive/warehouse/assorted_test_db.db")
        );
    }

    #[test]
    fn test_aligned_locations_use_warehouse_directories() {
        let mut config = config(DataStrategy::Sql);
        config.align_locations = true;
        config.transfer.warehouse = Warehouse {
            managed_directory: Some("/warehouse/tablespace/managed/hive".into()),
            external_directory: Some("/warehouse/tablespace/external/hive".into()),
        };
        let mut db = db_with_left("hdfs://HDP50/apps/hive/warehouse/assorted_test_db.db");
        build(config, &mut db);
        let descriptions: Vec<_> = db
            .sql_for(Environment::Right)
            .iter()
            .map(|p| p.description.as_str())
            .collect();
        assert_eq!(
            descriptions,
            vec![
                sql::CREATE_DATABASE_DESC,
                sql::ALTER_DB_LOCATION_DESC,
                sql::ALTER_DB_MNGD_LOCATION_DESC
            ]
        );
        assert_eq!(
            db.sql_for(Environment::Right)[2].action,
            "ALTER DATABASE assorted_test_db SET MANAGEDLOCATION \"hdfs://HOME90/warehouse/tablespace/managed/hive/assorted_test_db.db\""
        );
    }

    #[test]
    fn test_warehouse_directories_apply_without_alignment() {
        let mut config = config(DataStrategy::SchemaOnly);
        config.transfer.warehouse = Warehouse {
            managed_directory: Some("/wh/managed".into()),
            external_directory: Some("/wh/external".into()),
        };
        let mut db = db_with_left("hdfs://HDP50/apps/hive/warehouse/assorted_test_db.db");
        build(config, &mut db);
        let right = db.sql_for(Environment::Right);
        assert_eq!(
            right[1].action,
            "ALTER DATABASE assorted_test_db SET LOCATION \"hdfs://HOME90/wh/external/assorted_test_db.db\""
        );
        assert_eq!(
            right[2].action,
            "ALTER DATABASE assorted_test_db SET MANAGEDLOCATION \"hdfs://HOME90/wh/managed/assorted_test_db.db\""
        );
    }

    #[test]
    fn test_read_only_generates_nothing() {
        let mut config = config(DataStrategy::SchemaOnly);
        config.read_only = true;
        let mut db = db_with_left("hdfs://HDP50/apps/hive/warehouse/assorted_test_db.db");
        build(config, &mut db);
        assert!(db.sql.is_empty());
        assert_eq!(db.issues[&Environment::Right], vec![READ_ONLY_MISSING_DB_ISSUE]);
    }

    #[test]
    fn test_dump_creates_database_on_left() {
        let mut db = db_with_left("hdfs://HDP50/apps/hive/warehouse/assorted_test_db.db");
        build(config(DataStrategy::Dump), &mut db);
        assert!(db.sql_for(Environment::Right).is_empty());
        assert_eq!(db.sql_for(Environment::Left)[0].description, sql::CREATE_DATABASE_DESC);
    }

    #[test]
    fn test_storage_migration_alters_left() {
        let mut config = config(DataStrategy::StorageMigration);
        config.transfer.target_namespace = Some("s3a://bucket".into());
        let mut db = db_with_left("hdfs://HDP50/apps/hive/warehouse/assorted_test_db.db");
        build(config, &mut db);
        let left = db.sql_for(Environment::Left);
        assert_eq!(left.len(), 1);
        assert_eq!(
            left[0].action,
            "ALTER DATABASE assorted_test_db SET LOCATION \"s3a://bucket/apps/hive/warehouse/assorted_test_db.db\""
        );
    }
}
