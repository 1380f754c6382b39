//! Discovered metastore metadata.
//!
//! The engine never talks to a metastore. Discovery happens elsewhere and
//! hands over per-table snapshots for LEFT and RIGHT through a
//! [`MetadataSource`]. [`InventoryFile`] reads them from a YAML document:
//!
//! ```yaml
//! databases:
//!   - name: assorted_test_db
//!     left:
//!       exists: true
//!       location: hdfs://HDP50/apps/hive/warehouse/assorted_test_db.db
//!     tables:
//!       - name: ext_part_01
//!         left:
//!           definition:
//!             - CREATE EXTERNAL TABLE `ext_part_01`(
//!             - ...
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::core::identifier::validate_identifier;
use crate::core::{DatabaseEnvironment, EnvironmentTable};
use crate::error::{MirrorError, Result};

/// Source of discovered metadata.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Names of the databases available.
    async fn databases(&self) -> Result<Vec<String>>;

    /// Snapshot of one database and its tables.
    async fn database(&self, name: &str) -> Result<DatabaseSnapshot>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub databases: Vec<DatabaseSnapshot>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseSnapshot {
    pub name: String,
    #[serde(default)]
    pub left: DatabaseEnvironment,
    #[serde(default)]
    pub right: DatabaseEnvironment,
    #[serde(default)]
    pub tables: Vec<TableSnapshot>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub name: String,
    #[serde(default)]
    pub left: EnvironmentTable,
    #[serde(default)]
    pub right: EnvironmentTable,
}

impl Inventory {
    /// Parse and normalize an inventory document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut inventory: Inventory = serde_yaml::from_str(yaml)?;
        inventory.prepare()?;
        Ok(inventory)
    }

    /// Validate names and derive the facts discovery leaves implicit.
    fn prepare(&mut self) -> Result<()> {
        let mut seen = HashSet::new();
        for db in &mut self.databases {
            validate_identifier(&db.name)?;
            if !seen.insert(db.name.clone()) {
                return Err(MirrorError::inventory(format!("Duplicate database: {}", db.name)));
            }
            db.prepare()?;
        }
        Ok(())
    }
}

impl DatabaseSnapshot {
    fn prepare(&mut self) -> Result<()> {
        let mut seen = HashSet::new();
        for table in &mut self.tables {
            validate_identifier(&table.name)?;
            if !seen.insert(table.name.clone()) {
                return Err(MirrorError::inventory(format!(
                    "Duplicate table: {}.{}",
                    self.name, table.name
                )));
            }
            for side in [&mut table.left, &mut table.right] {
                if !side.definition.is_empty() {
                    side.exists = true;
                }
                side.normalize(&table.name);
            }
            if !table.left.exists && !table.right.exists {
                return Err(MirrorError::inventory(format!(
                    "Table {}.{} exists on neither cluster",
                    self.name, table.name
                )));
            }
        }
        if self.tables.iter().any(|t| t.left.exists) {
            self.left.exists = true;
        }
        Ok(())
    }
}

/// Inventory stored as a YAML file.
#[derive(Debug, Clone)]
pub struct InventoryFile {
    path: PathBuf,
    inventory: Inventory,
}

impl InventoryFile {
    /// Read and validate an inventory file.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let content = tokio::fs::read_to_string(&path).await?;
        let inventory = Inventory::from_yaml(&content)?;
        info!(
            "Loaded inventory {:?}: {} databases",
            path,
            inventory.databases.len()
        );
        Ok(Self { path, inventory })
    }

    pub fn from_inventory(inventory: Inventory) -> Self {
        Self {
            path: PathBuf::new(),
            inventory,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl MetadataSource for InventoryFile {
    async fn databases(&self) -> Result<Vec<String>> {
        Ok(self.inventory.databases.iter().map(|d| d.name.clone()).collect())
    }

    async fn database(&self, name: &str) -> Result<DatabaseSnapshot> {
        debug!("Reading database {} from inventory", name);
        self.inventory
            .databases
            .iter()
            .find(|d| d.name == name)
            .cloned()
            .ok_or_else(|| MirrorError::inventory(format!("Database not in inventory: {}", name)))
    }
}
