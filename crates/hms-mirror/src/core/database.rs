//! Database-level DDL and the table map of one database.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::environment::{Environment, SqlPair};
use super::mirror::TableMirror;
use super::phase::PhaseState;

/// A database as seen from one cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseEnvironment {
    #[serde(default)]
    pub exists: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_location: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DBMirror {
    pub name: String,
    /// Name of the database on the target.
    pub target_name: String,
    #[serde(default)]
    pub sql: BTreeMap<Environment, Vec<SqlPair>>,
    /// Discovered locations for LEFT, planned locations for the side that
    /// gets altered.
    #[serde(default)]
    pub locations: BTreeMap<Environment, DatabaseEnvironment>,
    #[serde(default)]
    pub issues: BTreeMap<Environment, Vec<String>>,
    #[serde(default)]
    pub tables: BTreeMap<String, TableMirror>,
}

impl DBMirror {
    pub fn new(name: impl Into<String>, target_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_name: target_name.into(),
            ..Default::default()
        }
    }

    pub fn add_sql(&mut self, env: Environment, description: impl Into<String>, action: impl Into<String>) {
        self.sql
            .entry(env)
            .or_default()
            .push(SqlPair::new(description, action));
    }

    pub fn add_issue(&mut self, env: Environment, issue: impl Into<String>) {
        self.issues.entry(env).or_default().push(issue.into());
    }

    pub fn sql_for(&self, env: Environment) -> &[SqlPair] {
        self.sql.get(&env).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn location(&self, env: Environment) -> Option<&DatabaseEnvironment> {
        self.locations.get(&env)
    }

    pub fn table(&self, name: &str) -> Option<&TableMirror> {
        self.tables.get(name)
    }

    /// Number of tables in each phase state.
    pub fn phase_summary(&self) -> BTreeMap<PhaseState, usize> {
        let mut summary = BTreeMap::new();
        for table in self.tables.values() {
            *summary.entry(table.phase_state).or_insert(0) += 1;
        }
        summary
    }

    pub fn error_count(&self) -> usize {
        self.tables
            .values()
            .filter(|t| t.phase_state == PhaseState::Error)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::environment::EnvironmentTable;

    #[test]
    fn test_phase_summary_counts_states() {
        let mut db = DBMirror::new("sales", "sales");
        for (name, state) in [
            ("a", PhaseState::CalculatedSql),
            ("b", PhaseState::CalculatedSql),
            ("c", PhaseState::Error),
        ] {
            let mut table = TableMirror::new(name, EnvironmentTable::named(name), EnvironmentTable::named(name));
            table.phase_state = state;
            db.tables.insert(name.to_string(), table);
        }
        let summary = db.phase_summary();
        assert_eq!(summary.get(&PhaseState::CalculatedSql), Some(&2));
        assert_eq!(summary.get(&PhaseState::Error), Some(&1));
        assert_eq!(db.error_count(), 1);
    }

    #[test]
    fn test_sql_per_environment() {
        let mut db = DBMirror::new("sales", "sales");
        db.add_sql(Environment::Right, "Create Database", "CREATE DATABASE IF NOT EXISTS sales\n");
        assert_eq!(db.sql_for(Environment::Right).len(), 1);
        assert!(db.sql_for(Environment::Left).is_empty());
    }
}
