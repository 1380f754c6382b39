//! Configuration type definitions with auto-tuning based on system resources.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use sysinfo::System;
use tracing::info;

use crate::error::MirrorError;
use crate::hive::location::Warehouse;

/// System resource information for auto-tuning.
#[derive(Debug, Clone)]
pub struct SystemResources {
    /// Total RAM in GB.
    pub total_memory_gb: f64,
    /// Number of CPU cores.
    pub cpu_cores: usize,
}

impl SystemResources {
    /// Detect system resources.
    pub fn detect() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_cpu();

        Self {
            total_memory_gb: sys.total_memory() as f64 / (1024.0 * 1024.0 * 1024.0),
            cpu_cores: sys.cpus().len(),
        }
    }

    /// Log detected system resources.
    pub fn log(&self) {
        info!(
            "System resources: {:.1} GB RAM, {} CPU cores",
            self.total_memory_gb, self.cpu_cores
        );
    }
}

/// How a table is moved (or described) from LEFT to RIGHT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataStrategy {
    /// Table definitions only, locations translated to the target namespace.
    #[default]
    SchemaOnly,
    /// LEFT-only script that recreates the tables.
    Dump,
    /// RIGHT tables read LEFT's data in place.
    Common,
    /// Data moved with INSERT OVERWRITE through a shadow table.
    Sql,
    /// Data moved with EXPORT / IMPORT.
    ExportImport,
    /// SQL for partitioned tables, EXPORT_IMPORT otherwise.
    Hybrid,
    /// Transactional tables moved through transfer and shadow tables.
    Acid,
    /// Same-cluster relocation of table data.
    StorageMigration,
}

impl DataStrategy {
    pub const ALL: [DataStrategy; 8] = [
        DataStrategy::SchemaOnly,
        DataStrategy::Dump,
        DataStrategy::Common,
        DataStrategy::Sql,
        DataStrategy::ExportImport,
        DataStrategy::Hybrid,
        DataStrategy::Acid,
        DataStrategy::StorageMigration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataStrategy::SchemaOnly => "SCHEMA_ONLY",
            DataStrategy::Dump => "DUMP",
            DataStrategy::Common => "COMMON",
            DataStrategy::Sql => "SQL",
            DataStrategy::ExportImport => "EXPORT_IMPORT",
            DataStrategy::Hybrid => "HYBRID",
            DataStrategy::Acid => "ACID",
            DataStrategy::StorageMigration => "STORAGE_MIGRATION",
        }
    }

    /// Strategies that create or change tables on the RIGHT cluster.
    pub fn writes_right(&self) -> bool {
        !matches!(self, DataStrategy::Dump | DataStrategy::StorageMigration)
    }
}

impl fmt::Display for DataStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataStrategy {
    type Err = MirrorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_").to_ascii_uppercase();
        DataStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == wanted)
            .ok_or_else(|| {
                MirrorError::Config(format!(
                    "unknown data strategy '{}', expected one of: {}",
                    s,
                    DataStrategy::ALL.map(|d| d.as_str()).join(", ")
                ))
            })
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Strategy applied to every table (default: SCHEMA_ONLY).
    #[serde(default)]
    pub data_strategy: DataStrategy,

    /// Databases to process. Empty means every database in the inventory.
    #[serde(default)]
    pub databases: Vec<String>,

    #[serde(default)]
    pub filter: FilterConfig,

    /// Prefix added to database names on RIGHT.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_prefix: Option<String>,

    /// New name of the (single) database on RIGHT.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_rename: Option<String>,

    /// Bring RIGHT in line with LEFT, replacing tables that differ.
    #[serde(default)]
    pub sync: bool,

    /// RIGHT may not change the data it points at.
    #[serde(default)]
    pub read_only: bool,

    /// Relocate tables on the cluster they live on.
    #[serde(default)]
    pub in_place: bool,

    /// Place generated locations under the warehouse directories.
    #[serde(default)]
    pub align_locations: bool,

    /// Tables processed at once. Auto-tuned based on CPU cores if not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    #[serde(default)]
    pub migrate_acid: MigrateAcidConfig,

    #[serde(default)]
    pub hybrid: HybridConfig,

    #[serde(default)]
    pub transfer: TransferConfig,

    #[serde(default)]
    pub dump: DumpConfig,

    #[serde(default)]
    pub optimization: OptimizationConfig,

    #[serde(default)]
    pub clusters: ClustersConfig,
}

impl Config {
    /// Apply auto-tuned defaults based on system resources.
    /// Only fills in values that weren't explicitly set in the config file.
    pub fn with_auto_tuning(mut self) -> Self {
        if self.concurrency.is_none() {
            let resources = SystemResources::detect();
            resources.log();
            let concurrency = resources.cpu_cores.clamp(2, 32);
            info!("Auto-tuned config: concurrency={}", concurrency);
            self.concurrency = Some(concurrency);
        }
        self
    }

    pub fn get_concurrency(&self) -> usize {
        self.concurrency.unwrap_or(4).max(1)
    }

    /// ACID tables take part in the job.
    pub fn acid_enabled(&self) -> bool {
        self.migrate_acid.on || self.migrate_acid.only
    }

    /// Name a LEFT database gets on the target.
    pub fn target_db_name(&self, source_db: &str) -> String {
        if !self.data_strategy.writes_right() {
            return source_db.to_string();
        }
        if let Some(rename) = &self.db_rename {
            return rename.clone();
        }
        match &self.db_prefix {
            Some(prefix) => format!("{}{}", prefix, source_db),
            None => source_db.to_string(),
        }
    }

    /// Namespace generated locations are written to.
    pub fn target_namespace(&self) -> Option<String> {
        if let Some(ns) = &self.transfer.target_namespace {
            return Some(ns.clone());
        }
        let cluster = match self.data_strategy {
            DataStrategy::StorageMigration | DataStrategy::Dump => &self.clusters.left,
            _ => &self.clusters.right,
        };
        cluster.hcfs_namespace.clone()
    }

    /// Locations follow the warehouse directories rather than LEFT's layout.
    pub fn aligns_locations(&self) -> bool {
        self.align_locations || self.data_strategy == DataStrategy::StorageMigration
    }
}

/// Database and table selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_regex: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_regex: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_exclude_regex: Option<String>,
}

/// Transactional table handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrateAcidConfig {
    /// Include ACID tables alongside the others.
    #[serde(default)]
    pub on: bool,

    /// Process ACID tables only.
    #[serde(default)]
    pub only: bool,

    /// Convert ACID tables to EXTERNAL on the target.
    #[serde(default)]
    pub downgrade: bool,

    /// Partition limit for the ACID strategy (default: 500).
    #[serde(default = "default_acid_partition_limit")]
    pub partition_limit: usize,
}

impl Default for MigrateAcidConfig {
    fn default() -> Self {
        Self {
            on: false,
            only: false,
            downgrade: false,
            partition_limit: default_acid_partition_limit(),
        }
    }
}

/// Partition limits for the data strategies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridConfig {
    /// EXPORT/IMPORT is refused above this many partitions (default: 100).
    #[serde(default = "default_export_import_partition_limit")]
    pub export_import_partition_limit: usize,

    /// SQL is refused above this many partitions (default: 3000).
    #[serde(default = "default_sql_partition_limit")]
    pub sql_partition_limit: usize,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            export_import_partition_limit: default_export_import_partition_limit(),
            sql_partition_limit: default_sql_partition_limit(),
        }
    }
}

/// Working tables, paths and location overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Storage both clusters can reach, used for staging data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediate_storage: Option<String>,

    /// Common storage namespace replacing the authority of generated locations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_namespace: Option<String>,

    #[serde(default = "default_shadow_prefix")]
    pub shadow_prefix: String,

    #[serde(default = "default_transfer_prefix")]
    pub transfer_prefix: String,

    #[serde(default = "default_storage_migration_postfix")]
    pub storage_migration_postfix: String,

    /// Base path of EXPORT output on LEFT (default: "/apps/hive/warehouse/export_").
    #[serde(default = "default_export_base_dir_prefix")]
    pub export_base_dir_prefix: String,

    #[serde(default = "default_remote_working_directory")]
    pub remote_working_directory: String,

    #[serde(default)]
    pub warehouse: Warehouse,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            intermediate_storage: None,
            target_namespace: None,
            shadow_prefix: default_shadow_prefix(),
            transfer_prefix: default_transfer_prefix(),
            storage_migration_postfix: default_storage_migration_postfix(),
            export_base_dir_prefix: default_export_base_dir_prefix(),
            remote_working_directory: default_remote_working_directory(),
            warehouse: Warehouse::default(),
        }
    }
}

/// DUMP output options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DumpConfig {
    #[serde(default)]
    pub partition_mode: DumpPartitionMode,
}

/// How DUMP re-registers partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DumpPartitionMode {
    /// One MSCK REPAIR per table.
    #[default]
    Msck,
    /// One ADD PARTITION per discovered partition.
    AddPartitions,
}

/// Session settings emitted before data movement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptimizationConfig {
    #[serde(default)]
    pub sort_dynamic_partition_inserts: bool,

    #[serde(default)]
    pub auto_table_stats: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClustersConfig {
    #[serde(default)]
    pub left: ClusterConfig,

    #[serde(default)]
    pub right: ClusterConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Default filesystem of the cluster, e.g. `hdfs://HDP50`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hcfs_namespace: Option<String>,
}

// Default value functions for serde
fn default_acid_partition_limit() -> usize {
    500
}

fn default_export_import_partition_limit() -> usize {
    100
}

fn default_sql_partition_limit() -> usize {
    3000
}

fn default_shadow_prefix() -> String {
    "hms_mirror_shadow_".to_string()
}

fn default_transfer_prefix() -> String {
    "hms_mirror_transfer_".to_string()
}

fn default_storage_migration_postfix() -> String {
    "_storage_migration".to_string()
}

fn default_export_base_dir_prefix() -> String {
    "/apps/hive/warehouse/export_".to_string()
}

fn default_remote_working_directory() -> String {
    "hms_mirror_working".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_parse_and_display() {
        assert_eq!("export-import".parse::<DataStrategy>().ok(), Some(DataStrategy::ExportImport));
        assert_eq!("HYBRID".parse::<DataStrategy>().ok(), Some(DataStrategy::Hybrid));
        assert_eq!(DataStrategy::StorageMigration.to_string(), "STORAGE_MIGRATION");
        assert!("nope".parse::<DataStrategy>().is_err());
    }

    #[test]
    fn test_target_db_name() {
        let mut config = Config {
            data_strategy: DataStrategy::Sql,
            db_prefix: Some("archive_".into()),
            ..Default::default()
        };
        assert_eq!(config.target_db_name("sales"), "archive_sales");
        config.db_rename = Some("sales_v2".into());
        assert_eq!(config.target_db_name("sales"), "sales_v2");
        config.data_strategy = DataStrategy::Dump;
        assert_eq!(config.target_db_name("sales"), "sales");
    }

    #[test]
    fn test_target_namespace_resolution() {
        let mut config = Config::default();
        config.clusters.left.hcfs_namespace = Some("hdfs://HDP50".into());
        config.clusters.right.hcfs_namespace = Some("hdfs://HOME90".into());
        assert_eq!(config.target_namespace().as_deref(), Some("hdfs://HOME90"));

        config.data_strategy = DataStrategy::StorageMigration;
        assert_eq!(config.target_namespace().as_deref(), Some("hdfs://HDP50"));

        config.transfer.target_namespace = Some("s3a://common".into());
        assert_eq!(config.target_namespace().as_deref(), Some("s3a://common"));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.hybrid.export_import_partition_limit, 100);
        assert_eq!(config.hybrid.sql_partition_limit, 3000);
        assert_eq!(config.migrate_acid.partition_limit, 500);
        assert_eq!(config.transfer.shadow_prefix, "hms_mirror_shadow_");
        assert_eq!(config.dump.partition_mode, DumpPartitionMode::Msck);
        assert_eq!(config.get_concurrency(), 4);
    }

    #[test]
    fn test_auto_tuning_keeps_explicit_concurrency() {
        let config = Config {
            concurrency: Some(3),
            ..Default::default()
        }
        .with_auto_tuning();
        assert_eq!(config.concurrency, Some(3));
    }
}
