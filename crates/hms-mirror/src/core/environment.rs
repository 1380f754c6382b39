//! Per-side view of one table: discovered facts plus what the engine plans.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::hive::definition::TableDefinition;

/// Cluster role of a table snapshot.
///
/// LEFT and RIGHT are the source and target clusters. SHADOW and TRANSFER are
/// working tables that only exist for strategies staging data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Environment {
    Left,
    Right,
    Shadow,
    Transfer,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Environment::Left => "LEFT",
            Environment::Right => "RIGHT",
            Environment::Shadow => "SHADOW",
            Environment::Transfer => "TRANSFER",
        };
        f.write_str(name)
    }
}

/// What the engine intends to do with the table on one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreateStrategy {
    #[default]
    Nothing,
    Create,
    Replace,
    Leave,
}

/// One generated statement. The description doubles as a correlation key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlPair {
    pub description: String,
    pub action: String,
}

impl SqlPair {
    pub fn new(description: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            action: action.into(),
        }
    }
}

/// A table as seen from one environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentTable {
    /// Table name on this side.
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub exists: bool,

    /// Raw DDL lines as returned by `SHOW CREATE TABLE`.
    #[serde(default)]
    pub definition: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default)]
    pub partitioned: bool,

    #[serde(default)]
    pub partition_count: usize,

    /// Discovered partitions: spec (`k=v/k2=v2`) to location.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub partitions: BTreeMap<String, String>,

    /// Existing table properties.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,

    /// Properties the engine adds to the generated table.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub add_properties: BTreeMap<String, String>,

    #[serde(default)]
    pub sql: Vec<SqlPair>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cleanup_sql: Vec<SqlPair>,

    #[serde(default)]
    pub issues: Vec<String>,

    #[serde(default)]
    pub errors: Vec<String>,

    #[serde(default)]
    pub create_strategy: CreateStrategy,
}

impl EnvironmentTable {
    /// An empty, non-existent table called `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Fill the derived facts from the DDL: partitioning, location and
    /// properties not supplied by discovery.
    pub fn normalize(&mut self, table_name: &str) {
        if self.name.is_empty() {
            self.name = table_name.to_string();
        }
        if self.definition.is_empty() {
            self.partition_count = self.partition_count.max(self.partitions.len());
            self.partitioned = self.partitioned || self.partition_count > 0;
            return;
        }
        let def = self.table_definition();
        if def.is_partitioned() {
            self.partitioned = true;
        }
        if self.location.is_none() {
            self.location = def.location();
        }
        if self.properties.is_empty() {
            self.properties = def.properties().into_iter().collect();
        }
        self.partition_count = self.partition_count.max(self.partitions.len());
    }

    /// Parsed view over the DDL lines.
    pub fn table_definition(&self) -> TableDefinition {
        TableDefinition::new(self.definition.clone())
    }

    pub fn is_acid(&self) -> bool {
        self.table_definition().is_acid()
    }

    pub fn add_sql(&mut self, description: impl Into<String>, action: impl Into<String>) {
        self.sql.push(SqlPair::new(description, action));
    }

    pub fn add_cleanup_sql(&mut self, description: impl Into<String>, action: impl Into<String>) {
        self.cleanup_sql.push(SqlPair::new(description, action));
    }

    pub fn add_issue(&mut self, issue: impl Into<String>) {
        self.issues.push(issue.into());
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Find a generated statement by its description.
    pub fn sql_for(&self, description: &str) -> Option<&SqlPair> {
        self.sql.iter().find(|pair| pair.description == description)
    }

    /// Value of a property, looking at intended additions first.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.add_properties
            .get(key)
            .or_else(|| self.properties.get(key))
            .map(String::as_str)
    }
}
