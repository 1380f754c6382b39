//! Discovery-time selection of databases and tables.

use regex::Regex;

use crate::config::Config;
use crate::error::{MirrorError, Result};

/// Decides which discovered databases and tables enter the job at all.
///
/// Patterns must match the whole name.
#[derive(Debug, Clone)]
pub struct TableFilter {
    databases: Vec<String>,
    db_regex: Option<Regex>,
    table_regex: Option<Regex>,
    table_exclude_regex: Option<Regex>,
    acid_on: bool,
    acid_only: bool,
}

fn anchored(key: &str, pattern: &Option<String>) -> Result<Option<Regex>> {
    pattern
        .as_ref()
        .map(|p| {
            Regex::new(&format!("^(?:{})$", p))
                .map_err(|e| MirrorError::Config(format!("{} is not a valid regex: {}", key, e)))
        })
        .transpose()
}

impl TableFilter {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            databases: config.databases.clone(),
            db_regex: anchored("filter.db_regex", &config.filter.db_regex)?,
            table_regex: anchored("filter.table_regex", &config.filter.table_regex)?,
            table_exclude_regex: anchored(
                "filter.table_exclude_regex",
                &config.filter.table_exclude_regex,
            )?,
            acid_on: config.migrate_acid.on,
            acid_only: config.migrate_acid.only,
        })
    }

    pub fn admits_database(&self, name: &str) -> bool {
        if !self.databases.is_empty() && !self.databases.iter().any(|d| d == name) {
            return false;
        }
        self.db_regex.as_ref().map_or(true, |re| re.is_match(name))
    }

    pub fn admits_table(&self, name: &str, acid: bool) -> bool {
        if acid && !(self.acid_on || self.acid_only) {
            return false;
        }
        if !acid && self.acid_only {
            return false;
        }
        if let Some(re) = &self.table_regex {
            if !re.is_match(name) {
                return false;
            }
        }
        !self
            .table_exclude_regex
            .as_ref()
            .is_some_and(|re| re.is_match(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acid_tables_excluded_by_default() {
        let filter = TableFilter::from_config(&Config::default()).unwrap();
        assert!(filter.admits_table("ext_part_01", false));
        assert!(!filter.admits_table("acid_01", true));
    }

    #[test]
    fn test_acid_only_excludes_everything_else() {
        let mut config = Config::default();
        config.migrate_acid.only = true;
        let filter = TableFilter::from_config(&config).unwrap();
        assert!(filter.admits_table("acid_01", true));
        assert!(!filter.admits_table("ext_part_01", false));
    }

    #[test]
    fn test_table_patterns_match_whole_name() {
        let mut config = Config::default();
        config.filter.table_regex = Some("ext_.*".into());
        config.filter.table_exclude_regex = Some(".*_tmp".into());
        let filter = TableFilter::from_config(&config).unwrap();
        assert!(filter.admits_table("ext_part_01", false));
        assert!(!filter.admits_table("my_ext_part", false));
        assert!(!filter.admits_table("ext_part_tmp", false));
    }

    #[test]
    fn test_database_list_and_regex() {
        let mut config = Config::default();
        config.databases = vec!["sales".into(), "hr".into()];
        config.filter.db_regex = Some("s.*".into());
        let filter = TableFilter::from_config(&config).unwrap();
        assert!(filter.admits_database("sales"));
        assert!(!filter.admits_database("hr"));
        assert!(!filter.admits_database("finance"));
    }
}
