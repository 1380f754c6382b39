//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;
pub use validation::{validate_flags, ValidationCode};

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Compute a SHA256 fingerprint of the effective configuration.
    pub fn hash(&self) -> String {
        let yaml = serde_yaml::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(yaml.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const YAML: &str = r#"
data_strategy: EXPORT_IMPORT
databases: [assorted_test_db]
sync: true
migrate_acid:
  on: true
hybrid:
  export_import_partition_limit: 50
transfer:
  intermediate_storage: s3a://staging
  warehouse:
    managed_directory: /warehouse/tablespace/managed/hive
    external_directory: /warehouse/tablespace/external/hive
dump:
  partition_mode: add_partitions
clusters:
  left:
    hcfs_namespace: hdfs://HDP50
  right:
    hcfs_namespace: hdfs://HOME90
"#;

    #[test]
    fn test_from_yaml() {
        let config = Config::from_yaml(YAML).unwrap();
        assert_eq!(config.data_strategy, DataStrategy::ExportImport);
        assert_eq!(config.databases, vec!["assorted_test_db"]);
        assert!(config.sync);
        assert!(config.migrate_acid.on);
        assert_eq!(config.migrate_acid.partition_limit, 500);
        assert_eq!(config.hybrid.export_import_partition_limit, 50);
        assert_eq!(config.hybrid.sql_partition_limit, 3000);
        assert_eq!(config.transfer.intermediate_storage.as_deref(), Some("s3a://staging"));
        assert_eq!(config.dump.partition_mode, DumpPartitionMode::AddPartitions);
        assert!(config.transfer.warehouse.is_complete());
    }

    #[test]
    fn test_from_yaml_rejects_structural_errors() {
        let err = Config::from_yaml("hybrid:\n  sql_partition_limit: 0\n").unwrap_err();
        assert!(err.to_string().contains("sql_partition_limit"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(YAML.as_bytes()).unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.clusters.right.hcfs_namespace.as_deref(), Some("hdfs://HOME90"));
    }

    #[test]
    fn test_hash_is_stable_and_sensitive() {
        let a = Config::from_yaml(YAML).unwrap();
        let b = Config::from_yaml(YAML).unwrap();
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.hash().len(), 64);

        let mut c = b.clone();
        c.sync = false;
        assert_ne!(a.hash(), c.hash());
    }
}
