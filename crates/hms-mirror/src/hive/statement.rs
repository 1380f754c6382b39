//! HiveQL statement templates and their step descriptions.
//!
//! Descriptions are stable strings: reports group by them and callers use them
//! to find a particular step in a side's SQL list.

use crate::core::identifier::hive_ident;

pub const CREATE_DATABASE_DESC: &str = "Create Database";
pub const ALTER_DB_LOCATION_DESC: &str = "Alter Database Location";
pub const ALTER_DB_MNGD_LOCATION_DESC: &str = "Alter Database Location (Managed)";
pub const USE_DESC: &str = "Selecting DB";
pub const CREATE_TABLE_DESC: &str = "Creating Table";
pub const CREATE_SHADOW_TABLE_DESC: &str = "Creating Shadow Table";
pub const CREATE_TRANSFER_TABLE_DESC: &str = "Creating Transfer Table";
pub const EXPORT_TABLE_DESC: &str = "EXPORT Table";
pub const IMPORT_TABLE_DESC: &str = "IMPORT Table";
pub const MSCK_REPAIR_DESC: &str = "Repairing Table (MSCK)";
pub const ADD_PARTITION_DESC: &str = "Alter Table Partition Add Location";
pub const MOVE_PARTITIONED_DESC: &str = "Moving data to partitioned table";
pub const MOVE_TRANSFER_DESC: &str = "Moving data to transfer table";
pub const MOVE_DATA_DESC: &str = "Moving data to new table";
pub const STATS_AUTOGATHER_DESC: &str = "Setting: hive.stats.autogather";
pub const SORT_DYNAMIC_PARTITION_DESC: &str = "Setting hive.optimize.sort.dynamic.partition";
pub const SET_TABLE_PROPERTY_DESC: &str = "Setting Table Property";
pub const DROP_TABLE_DESC: &str = "Dropping Table";
pub const DROP_SHADOW_TABLE_DESC: &str = "Dropping Shadow Table";
pub const DROP_TRANSFER_TABLE_DESC: &str = "Dropping Transfer Table";
pub const RENAME_TABLE_DESC: &str = "Rename Table";
pub const REMOVE_TABLE_DESC: &str = "Remove Table";
pub const SKIPPED_DESC: &str = "Skipped";

pub const STATS_AUTOGATHER: &str = "hive.stats.autogather";
pub const SORT_DYNAMIC_PARTITION: &str = "hive.optimize.sort.dynamic.partition";

pub fn create_database(db: &str) -> String {
    format!("CREATE DATABASE IF NOT EXISTS {}\n", hive_ident(db))
}

pub fn alter_db_location(db: &str, location: &str) -> String {
    format!("ALTER DATABASE {} SET LOCATION \"{}\"", hive_ident(db), location)
}

pub fn alter_db_managed_location(db: &str, location: &str) -> String {
    format!("ALTER DATABASE {} SET MANAGEDLOCATION \"{}\"", hive_ident(db), location)
}

pub fn use_db(db: &str) -> String {
    format!("USE {}", hive_ident(db))
}

pub fn msck_repair(table: &str) -> String {
    format!("MSCK REPAIR TABLE {}", hive_ident(table))
}

pub fn export_table(table: &str, path: &str) -> String {
    format!("EXPORT TABLE {} TO \"{}\"", hive_ident(table), path)
}

pub fn import_table(table: &str, path: &str) -> String {
    format!("IMPORT TABLE {} FROM \"{}\"", hive_ident(table), path)
}

pub fn import_external_table(table: &str, path: &str, location: &str) -> String {
    format!(
        "IMPORT EXTERNAL TABLE {} FROM \"{}\" LOCATION \"{}\"",
        hive_ident(table),
        path,
        location
    )
}

/// `spec` is in path form: `year=2021/month=03`.
pub fn add_partition(table: &str, spec: &str, location: &str) -> String {
    format!(
        "ALTER TABLE {} ADD IF NOT EXISTS PARTITION ({}) LOCATION \"{}\"",
        hive_ident(table),
        partition_clause(spec),
        location
    )
}

/// Turn `year=2021/month=03` into `year='2021', month='03'`.
pub fn partition_clause(spec: &str) -> String {
    spec.split('/')
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('=') {
            Some((k, v)) => format!("{}='{}'", k, v.replace('\'', "\\'")),
            None => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn set_session(key: &str, value: &str) -> String {
    format!("SET {}={}", key, value)
}

pub fn set_table_property(table: &str, key: &str, value: &str) -> String {
    format!(
        "ALTER TABLE {} SET TBLPROPERTIES (\"{}\"=\"{}\")",
        hive_ident(table),
        key,
        value
    )
}

/// Copy every row of `from` into `to`, distributing on the partition columns
/// when the target is partitioned.
pub fn insert_overwrite(from: &str, to: &str, partition_columns: &[String]) -> String {
    if partition_columns.is_empty() {
        return format!(
            "FROM {} INSERT OVERWRITE TABLE {} SELECT *",
            hive_ident(from),
            hive_ident(to)
        );
    }
    let cols = partition_columns
        .iter()
        .map(|c| hive_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "FROM {} INSERT OVERWRITE TABLE {} PARTITION ({}) SELECT * DISTRIBUTE BY {}",
        hive_ident(from),
        hive_ident(to),
        cols,
        cols
    )
}

/// Placeholder action for a side whose generation was suppressed.
pub fn skipped(table: &str) -> String {
    format!("-- {} skipped", hive_ident(table))
}

pub fn drop_table(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", hive_ident(table))
}

pub fn rename_table(from: &str, to: &str) -> String {
    format!("ALTER TABLE {} RENAME TO {}", hive_ident(from), hive_ident(to))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_database_keeps_trailing_newline() {
        assert_eq!(
            create_database("assorted_test_db"),
            "CREATE DATABASE IF NOT EXISTS assorted_test_db\n"
        );
    }

    #[test]
    fn test_database_locations() {
        assert_eq!(
            alter_db_location("db", "hdfs://HOME90/warehouse/external/db.db"),
            "ALTER DATABASE db SET LOCATION \"hdfs://HOME90/warehouse/external/db.db\""
        );
        assert_eq!(
            alter_db_managed_location("db", "hdfs://HOME90/warehouse/managed/db.db"),
            "ALTER DATABASE db SET MANAGEDLOCATION \"hdfs://HOME90/warehouse/managed/db.db\""
        );
    }

    #[test]
    fn test_partition_clause_from_path_spec() {
        assert_eq!(partition_clause("year=2021/month=03"), "year='2021', month='03'");
        assert_eq!(
            add_partition("web_sales", "num=1", "hdfs://HDP50/x/num=1"),
            "ALTER TABLE web_sales ADD IF NOT EXISTS PARTITION (num='1') LOCATION \"hdfs://HDP50/x/num=1\""
        );
    }

    #[test]
    fn test_insert_overwrite_partitioned_distributes() {
        let cols = vec!["num".to_string()];
        assert_eq!(
            insert_overwrite("hms_mirror_shadow_ext_part_01", "ext_part_01", &cols),
            "FROM hms_mirror_shadow_ext_part_01 INSERT OVERWRITE TABLE ext_part_01 PARTITION (num) SELECT * DISTRIBUTE BY num"
        );
        assert_eq!(
            insert_overwrite("a", "b", &[]),
            "FROM a INSERT OVERWRITE TABLE b SELECT *"
        );
    }

    #[test]
    fn test_import_variants() {
        assert_eq!(
            import_table("acid_01", "hdfs://HDP50/apps/hive/warehouse/export_db/acid_01"),
            "IMPORT TABLE acid_01 FROM \"hdfs://HDP50/apps/hive/warehouse/export_db/acid_01\""
        );
        assert!(import_external_table("t", "p", "l").ends_with("LOCATION \"l\""));
    }
}
