use std::sync::Arc;

use crate::config::Config;
use crate::hive::location::{join_path, namespace_of, LocationTranslator};

/// Settings shared by every table of one database.
#[derive(Debug, Clone)]
pub struct DatabaseContext {
    pub config: Arc<Config>,
    pub source_db: String,
    pub target_db: String,
    /// Namespace of LEFT, from configuration or the discovered database location.
    pub left_namespace: Option<String>,
    pub translator: LocationTranslator,
}

impl DatabaseContext {
    pub fn new(config: Arc<Config>, source_db: &str, left_db_location: Option<&str>) -> Self {
        let target_db = config.target_db_name(source_db);
        let left_namespace = config
            .clusters
            .left
            .hcfs_namespace
            .clone()
            .or_else(|| left_db_location.and_then(namespace_of).map(str::to_string));
        let translator = LocationTranslator::new(source_db, target_db.clone())
            .with_namespace(config.target_namespace())
            .with_warehouse(config.transfer.warehouse.clone(), config.aligns_locations());

        Self {
            config,
            source_db: source_db.to_string(),
            target_db,
            left_namespace,
            translator,
        }
    }

    /// Where EXPORT output and transfer tables live for `table`.
    pub fn working_path(&self, table: &str, left_location: Option<&str>) -> String {
        let transfer = &self.config.transfer;
        let db_dir = format!("{}.db", self.source_db);

        if let Some(storage) = &transfer.intermediate_storage {
            return join_path(storage, &[&transfer.remote_working_directory, &db_dir, table]);
        }
        if let Some(common) = &transfer.target_namespace {
            return join_path(common, &[&transfer.remote_working_directory, &db_dir, table]);
        }
        let ns = self
            .left_namespace
            .as_deref()
            .or_else(|| left_location.and_then(namespace_of))
            .unwrap_or("")
            .trim_end_matches('/');
        format!(
            "{}{}{}/{}",
            ns, transfer.export_base_dir_prefix, self.source_db, table
        )
    }

    /// Staging goes through storage both clusters can reach.
    pub fn uses_shared_storage(&self) -> bool {
        let transfer = &self.config.transfer;
        transfer.intermediate_storage.is_some() || transfer.target_namespace.is_some()
    }

    pub fn shadow_name(&self, table: &str) -> String {
        format!("{}{}", self.config.transfer.shadow_prefix, table)
    }

    pub fn transfer_name(&self, table: &str) -> String {
        format!("{}{}", self.config.transfer.transfer_prefix, table)
    }

    pub fn archive_name(&self, table: &str) -> String {
        format!("{}{}", table, self.config.transfer.storage_migration_postfix)
    }
}
