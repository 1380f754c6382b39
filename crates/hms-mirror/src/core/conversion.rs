//! The job root: every database mirror plus what decides the return code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::database::DBMirror;
use super::environment::{Environment, EnvironmentTable};
use super::mirror::TableMirror;
use super::phase::PhaseState;
use crate::config::{Config, DataStrategy};
use crate::error::{JobValidationFailure, Result};

/// Namespace and warehouse settings in effect for one cluster role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hcfs_namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_directory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_directory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub key: Uuid,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub strategy: DataStrategy,
    /// SHA-256 of the configuration the job ran with.
    pub config_hash: String,
    #[serde(default)]
    pub databases: BTreeMap<String, DBMirror>,
    #[serde(default)]
    pub context: BTreeMap<Environment, EnvironmentContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<JobValidationFailure>,
    #[serde(default)]
    pub cancelled: bool,
}

impl ConversionResult {
    pub fn new(config: &Config) -> Self {
        let warehouse = &config.transfer.warehouse;
        let left = EnvironmentContext {
            hcfs_namespace: config.clusters.left.hcfs_namespace.clone(),
            ..Default::default()
        };
        let right = EnvironmentContext {
            hcfs_namespace: config.clusters.right.hcfs_namespace.clone(),
            managed_directory: warehouse.managed_directory.clone(),
            external_directory: warehouse.external_directory.clone(),
            target_namespace: config.target_namespace(),
        };

        Self {
            key: Uuid::new_v4(),
            started_at: Utc::now(),
            completed_at: None,
            strategy: config.data_strategy,
            config_hash: config.hash(),
            databases: BTreeMap::new(),
            context: BTreeMap::from([(Environment::Left, left), (Environment::Right, right)]),
            validation: None,
            cancelled: false,
        }
    }

    pub fn database(&self, name: &str) -> Option<&DBMirror> {
        self.databases.get(name)
    }

    pub fn table(&self, database: &str, table: &str) -> Option<&TableMirror> {
        self.database(database)?.table(table)
    }

    pub fn environment(&self, database: &str, table: &str, env: Environment) -> Option<&EnvironmentTable> {
        self.table(database, table)?.env(env)
    }

    /// `0` on success, the number of failed tables, or the negated
    /// validation bitset when the job never started.
    pub fn return_code(&self) -> i64 {
        if let Some(failure) = &self.validation {
            return failure.return_code();
        }
        self.databases.values().map(|db| db.error_count() as i64).sum()
    }

    /// Table counts per phase state across all databases.
    pub fn phase_summary(&self) -> BTreeMap<PhaseState, usize> {
        let mut summary = BTreeMap::new();
        for db in self.databases.values() {
            for (state, count) in db.phase_summary() {
                *summary.entry(state).or_insert(0) += count;
            }
        }
        summary
    }

    pub fn table_count(&self) -> usize {
        self.databases.values().map(|db| db.tables.len()).sum()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationCode;

    fn result_with(states: &[PhaseState]) -> ConversionResult {
        let mut result = ConversionResult::new(&Config::default());
        let mut db = DBMirror::new("sales", "sales");
        for (i, state) in states.iter().enumerate() {
            let name = format!("t{}", i);
            let mut table = TableMirror::new(&name, EnvironmentTable::named(&name), EnvironmentTable::named(&name));
            table.phase_state = *state;
            db.tables.insert(name, table);
        }
        result.databases.insert("sales".into(), db);
        result
    }

    #[test]
    fn test_return_code_success() {
        let result = result_with(&[PhaseState::CalculatedSql, PhaseState::Processed]);
        assert_eq!(result.return_code(), 0);
    }

    #[test]
    fn test_return_code_counts_error_tables() {
        let result = result_with(&[PhaseState::Error, PhaseState::CalculatedSql, PhaseState::Error]);
        assert_eq!(result.return_code(), 2);
        assert_eq!(result.phase_summary().get(&PhaseState::Error), Some(&2));
    }

    #[test]
    fn test_return_code_validation_wins() {
        let mut result = result_with(&[PhaseState::Init]);
        result.validation = Some(JobValidationFailure::new(vec![
            ValidationCode::IntermediateAndCommonStorage,
        ]));
        assert_eq!(result.return_code(), -16);
    }

    #[test]
    fn test_lookup_and_serialization() {
        let result = result_with(&[PhaseState::CalculatedSql]);
        assert!(result.environment("sales", "t0", Environment::Left).is_some());
        assert!(result.environment("sales", "t0", Environment::Shadow).is_none());

        let json = result.to_json().unwrap();
        let back: ConversionResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
        assert!(result.to_yaml().unwrap().contains("CALCULATED_SQL"));
    }
}
