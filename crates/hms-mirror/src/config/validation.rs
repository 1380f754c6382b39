//! Configuration validation.
//!
//! Two layers: [`validate`] rejects structurally broken configuration at load
//! time, [`validate_flags`] checks flag combinations and reports every violated
//! rule so the job can record them as a bitset.

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{Config, DataStrategy};
use crate::error::{JobValidationFailure, MirrorError, Result};
use crate::hive::location::split_namespace;

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if let Some(0) = config.concurrency {
        return Err(MirrorError::Config("concurrency must be at least 1".into()));
    }
    if config.hybrid.export_import_partition_limit == 0 {
        return Err(MirrorError::Config(
            "hybrid.export_import_partition_limit must be at least 1".into(),
        ));
    }
    if config.hybrid.sql_partition_limit == 0 {
        return Err(MirrorError::Config(
            "hybrid.sql_partition_limit must be at least 1".into(),
        ));
    }
    if config.migrate_acid.partition_limit == 0 {
        return Err(MirrorError::Config(
            "migrate_acid.partition_limit must be at least 1".into(),
        ));
    }

    for (key, pattern) in [
        ("filter.db_regex", &config.filter.db_regex),
        ("filter.table_regex", &config.filter.table_regex),
        ("filter.table_exclude_regex", &config.filter.table_exclude_regex),
    ] {
        if let Some(pattern) = pattern {
            Regex::new(pattern)
                .map_err(|e| MirrorError::Config(format!("{} is not a valid regex: {}", key, e)))?;
        }
    }

    for (key, value) in [
        ("clusters.left.hcfs_namespace", &config.clusters.left.hcfs_namespace),
        ("clusters.right.hcfs_namespace", &config.clusters.right.hcfs_namespace),
        ("transfer.target_namespace", &config.transfer.target_namespace),
        ("transfer.intermediate_storage", &config.transfer.intermediate_storage),
    ] {
        if let Some(uri) = value {
            validate_namespace(key, uri)?;
        }
    }

    for (key, value) in [
        ("transfer.shadow_prefix", &config.transfer.shadow_prefix),
        ("transfer.transfer_prefix", &config.transfer.transfer_prefix),
        ("transfer.storage_migration_postfix", &config.transfer.storage_migration_postfix),
        ("transfer.export_base_dir_prefix", &config.transfer.export_base_dir_prefix),
        ("transfer.remote_working_directory", &config.transfer.remote_working_directory),
    ] {
        if value.trim().is_empty() {
            return Err(MirrorError::Config(format!("{} cannot be empty", key)));
        }
    }

    for (key, value) in [
        ("transfer.warehouse.managed_directory", &config.transfer.warehouse.managed_directory),
        ("transfer.warehouse.external_directory", &config.transfer.warehouse.external_directory),
    ] {
        if let Some(dir) = value {
            if !dir.starts_with('/') {
                return Err(MirrorError::Config(format!(
                    "{} must be an absolute path without namespace, got '{}'",
                    key, dir
                )));
            }
        }
    }

    if config.db_rename.is_some() {
        if config.db_prefix.is_some() {
            return Err(MirrorError::Config(
                "db_prefix and db_rename cannot be used together".into(),
            ));
        }
        if config.databases.len() != 1 {
            return Err(MirrorError::Config(
                "db_rename requires exactly one entry in databases".into(),
            ));
        }
    }

    Ok(())
}

fn validate_namespace(key: &str, uri: &str) -> Result<()> {
    match split_namespace(uri) {
        (Some(ns), _) if ns.len() > ns.find("://").map_or(0, |p| p + 3) => Ok(()),
        _ => Err(MirrorError::Config(format!(
            "{} must look like scheme://authority, got '{}'",
            key, uri
        ))),
    }
}

/// A flag combination the engine refuses to run with. Each code owns one bit
/// of the negative job return code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    AcidDowngradeInPlace,
    DowngradeWithoutAcid,
    AcidUnsupportedStrategy,
    InPlaceRequiresStorageMigration,
    IntermediateAndCommonStorage,
    StorageMigrationTargetMissing,
    ReadOnlyUnsupportedStrategy,
    SyncUnsupportedStrategy,
    AlignLocationsWithoutWarehouse,
}

impl ValidationCode {
    pub fn bit(&self) -> i64 {
        let position = match self {
            ValidationCode::AcidDowngradeInPlace => 0,
            ValidationCode::DowngradeWithoutAcid => 1,
            ValidationCode::AcidUnsupportedStrategy => 2,
            ValidationCode::InPlaceRequiresStorageMigration => 3,
            ValidationCode::IntermediateAndCommonStorage => 4,
            ValidationCode::StorageMigrationTargetMissing => 5,
            ValidationCode::ReadOnlyUnsupportedStrategy => 6,
            ValidationCode::SyncUnsupportedStrategy => 7,
            ValidationCode::AlignLocationsWithoutWarehouse => 8,
        };
        1 << position
    }

    pub fn message(&self) -> &'static str {
        match self {
            ValidationCode::AcidDowngradeInPlace => {
                "migrate_acid.only with downgrade cannot run in_place"
            }
            ValidationCode::DowngradeWithoutAcid => {
                "migrate_acid.downgrade requires migrate_acid.on or migrate_acid.only"
            }
            ValidationCode::AcidUnsupportedStrategy => {
                "ACID tables cannot be migrated with the COMMON strategy"
            }
            ValidationCode::InPlaceRequiresStorageMigration => {
                "in_place is only supported by the STORAGE_MIGRATION strategy"
            }
            ValidationCode::IntermediateAndCommonStorage => {
                "transfer.intermediate_storage and transfer.target_namespace are mutually exclusive"
            }
            ValidationCode::StorageMigrationTargetMissing => {
                "STORAGE_MIGRATION needs warehouse directories or transfer.target_namespace"
            }
            ValidationCode::ReadOnlyUnsupportedStrategy => {
                "read_only is not supported with STORAGE_MIGRATION or DUMP"
            }
            ValidationCode::SyncUnsupportedStrategy => {
                "sync is not supported with DUMP or STORAGE_MIGRATION"
            }
            ValidationCode::AlignLocationsWithoutWarehouse => {
                "align_locations requires both warehouse directories"
            }
        }
    }
}

/// Check flag combinations, collecting every violated rule.
pub fn validate_flags(config: &Config) -> std::result::Result<(), JobValidationFailure> {
    let strategy = config.data_strategy;
    let acid = &config.migrate_acid;
    let transfer = &config.transfer;

    let rules = [
        (
            ValidationCode::AcidDowngradeInPlace,
            acid.only && acid.downgrade && config.in_place,
        ),
        (
            ValidationCode::DowngradeWithoutAcid,
            acid.downgrade && !config.acid_enabled(),
        ),
        (
            ValidationCode::AcidUnsupportedStrategy,
            config.acid_enabled() && strategy == DataStrategy::Common,
        ),
        (
            ValidationCode::InPlaceRequiresStorageMigration,
            config.in_place && strategy != DataStrategy::StorageMigration,
        ),
        (
            ValidationCode::IntermediateAndCommonStorage,
            transfer.intermediate_storage.is_some() && transfer.target_namespace.is_some(),
        ),
        (
            ValidationCode::StorageMigrationTargetMissing,
            strategy == DataStrategy::StorageMigration
                && transfer.warehouse.is_empty()
                && transfer.target_namespace.is_none(),
        ),
        (
            ValidationCode::ReadOnlyUnsupportedStrategy,
            config.read_only
                && matches!(strategy, DataStrategy::StorageMigration | DataStrategy::Dump),
        ),
        (
            ValidationCode::SyncUnsupportedStrategy,
            config.sync && matches!(strategy, DataStrategy::Dump | DataStrategy::StorageMigration),
        ),
        (
            ValidationCode::AlignLocationsWithoutWarehouse,
            config.align_locations && !transfer.warehouse.is_complete(),
        ),
    ];

    let codes: Vec<ValidationCode> = rules
        .into_iter()
        .filter_map(|(code, violated)| violated.then_some(code))
        .collect();

    if codes.is_empty() {
        Ok(())
    } else {
        Err(JobValidationFailure::new(codes))
    }
}
