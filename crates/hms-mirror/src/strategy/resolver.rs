//! Strategy resolution as an ordered list of pure rules.
//!
//! Every rule looks at the same immutable [`DecisionInput`] and either returns
//! a [`Decision`] or passes. The first rule that decides wins; the last rule
//! always decides.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::{Config, DataStrategy};
use crate::core::{CreateStrategy, TableMirror};
use crate::hive::definition::EXTERNAL_TABLE_PURGE;

pub const SCHEMA_EXISTS_NO_ACTION: &str =
    "Schema exists already. No action. If you wish to rebuild the schema, drop it first and try again.";
pub const SCHEMA_EXISTS_MATCHES: &str = "Schema exists already and matches. No action necessary";
pub const SCHEMA_EXISTS_TARGET_ONLY: &str = "Schema exists on the target, but not on the source.";
pub const SCHEMA_EXISTS_READ_ONLY: &str =
    "Schema exists already and doesn't match. It can't be replaced while the target is read-only.";
pub const SCHEMA_EXISTS_PURGES: &str =
    "Schema exists already and doesn't match. The existing table purges its data when dropped, so it won't be replaced. Drop it manually and try again.";

/// Facts about one table that decide how it is migrated.
#[derive(Debug, Clone, Copy)]
pub struct DecisionInput<'a> {
    pub config: &'a Config,
    pub left_exists: bool,
    pub right_exists: bool,
    pub acid: bool,
    pub partitioned: bool,
    pub partition_count: usize,
    /// LEFT and RIGHT describe the same columns, partitions and storage.
    pub schema_matches: bool,
    /// The RIGHT table deletes its data when dropped.
    pub right_purges: bool,
}

impl<'a> DecisionInput<'a> {
    pub fn new(config: &'a Config, table: &TableMirror) -> Self {
        let left = table.left();
        let right = table.right();
        let acid = if left.exists { left.is_acid() } else { right.is_acid() };
        let schema_matches = left.exists
            && right.exists
            && left
                .table_definition()
                .schema_matches(&right.table_definition());
        let right_purges = right
            .property(EXTERNAL_TABLE_PURGE)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));

        Self {
            config,
            left_exists: left.exists,
            right_exists: right.exists,
            acid,
            partitioned: left.partitioned,
            partition_count: left.partition_count,
            schema_matches,
            right_purges,
        }
    }
}

/// What happens to the table as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "action")]
pub enum TableAction {
    /// Run the strategy's pipeline.
    Migrate,
    /// RIGHT already matches LEFT.
    Leave,
    /// The table only exists on RIGHT.
    Orphan,
    /// Stop with an error on RIGHT, optionally leaving a "Skipped" marker.
    Reject { message: String, skipped: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Strategy after routing; never HYBRID.
    pub strategy: DataStrategy,
    pub action: TableAction,
    pub right_create: CreateStrategy,
    /// An ACID table becomes EXTERNAL on the target.
    pub downgrade: bool,
}

impl Decision {
    fn new(input: &DecisionInput<'_>, strategy: DataStrategy, action: TableAction, right_create: CreateStrategy) -> Self {
        Self {
            strategy,
            action,
            right_create,
            downgrade: input.acid && input.config.migrate_acid.downgrade,
        }
    }
}

type Rule = fn(&DecisionInput<'_>, DataStrategy) -> Option<Decision>;

const RULES: &[(&str, Rule)] = &[
    ("orphan", orphan),
    ("existing-target", existing_target),
    ("migrate", migrate),
];

/// Resolve the strategy and action for one table.
pub fn resolve(input: &DecisionInput<'_>) -> Decision {
    let strategy = route(input);
    RULES
        .iter()
        .find_map(|(name, rule)| {
            let decision = rule(input, strategy)?;
            trace!("rule '{}' decided {} / {:?}", name, decision.strategy, decision.action);
            Some(decision)
        })
        .unwrap_or_else(|| Decision::new(input, strategy, TableAction::Migrate, CreateStrategy::Create))
}

/// Pick the concrete strategy for the table from the configured one.
pub fn route(input: &DecisionInput<'_>) -> DataStrategy {
    let config = input.config;
    let configured = config.data_strategy;

    if input.acid
        && matches!(
            configured,
            DataStrategy::Sql | DataStrategy::ExportImport | DataStrategy::Hybrid
        )
    {
        let over_limit = input.partitioned
            && input.partition_count > config.hybrid.export_import_partition_limit;
        return match (over_limit, config.migrate_acid.downgrade) {
            (true, false) => DataStrategy::Acid,
            (true, true) => DataStrategy::Sql,
            (false, _) => DataStrategy::ExportImport,
        };
    }

    match configured {
        DataStrategy::Hybrid if input.partitioned => DataStrategy::Sql,
        DataStrategy::Hybrid => DataStrategy::ExportImport,
        DataStrategy::Acid if !input.acid => DataStrategy::Sql,
        other => other,
    }
}

fn orphan(input: &DecisionInput<'_>, strategy: DataStrategy) -> Option<Decision> {
    (!input.left_exists && input.right_exists)
        .then(|| Decision::new(input, strategy, TableAction::Orphan, CreateStrategy::Nothing))
}

fn existing_target(input: &DecisionInput<'_>, strategy: DataStrategy) -> Option<Decision> {
    if !strategy.writes_right() || !input.right_exists {
        return None;
    }
    let config = input.config;
    let reject = |message: &str, skipped: bool| {
        Decision::new(
            input,
            strategy,
            TableAction::Reject {
                message: message.to_string(),
                skipped,
            },
            CreateStrategy::Nothing,
        )
    };

    let decision = if !config.sync {
        reject(SCHEMA_EXISTS_NO_ACTION, true)
    } else if input.schema_matches {
        Decision::new(input, strategy, TableAction::Leave, CreateStrategy::Leave)
    } else if config.read_only {
        reject(SCHEMA_EXISTS_READ_ONLY, false)
    } else if input.right_purges {
        reject(SCHEMA_EXISTS_PURGES, false)
    } else {
        Decision::new(input, strategy, TableAction::Migrate, CreateStrategy::Replace)
    };
    Some(decision)
}

fn migrate(input: &DecisionInput<'_>, strategy: DataStrategy) -> Option<Decision> {
    let right_create = if strategy.writes_right() {
        CreateStrategy::Create
    } else {
        CreateStrategy::Nothing
    };
    Some(Decision::new(input, strategy, TableAction::Migrate, right_create))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(strategy: DataStrategy) -> Config {
        Config {
            data_strategy: strategy,
            ..Default::default()
        }
    }

    fn input(config: &Config) -> DecisionInput<'_> {
        DecisionInput {
            config,
            left_exists: true,
            right_exists: false,
            acid: false,
            partitioned: false,
            partition_count: 0,
            schema_matches: false,
            right_purges: false,
        }
    }

    #[test]
    fn test_hybrid_routes_on_partitioning() {
        let config = config(DataStrategy::Hybrid);
        let mut i = input(&config);
        assert_eq!(route(&i), DataStrategy::ExportImport);
        i.partitioned = true;
        i.partition_count = 10;
        assert_eq!(route(&i), DataStrategy::Sql);
    }

    #[test]
    fn test_acid_routing_without_downgrade() {
        let config = config(DataStrategy::Sql);
        let mut i = input(&config);
        i.acid = true;
        assert_eq!(route(&i), DataStrategy::ExportImport);
        i.partitioned = true;
        i.partition_count = 101;
        assert_eq!(route(&i), DataStrategy::Acid);
    }

    #[test]
    fn test_acid_routing_with_downgrade() {
        let mut config = config(DataStrategy::Hybrid);
        config.migrate_acid.on = true;
        config.migrate_acid.downgrade = true;
        let mut i = input(&config);
        i.acid = true;
        i.partitioned = true;
        i.partition_count = 100;
        let decision = resolve(&i);
        assert_eq!(decision.strategy, DataStrategy::ExportImport);
        assert!(decision.downgrade);

        i.partition_count = 440;
        assert_eq!(resolve(&i).strategy, DataStrategy::Sql);
    }

    #[test]
    fn test_other_strategies_pass_through() {
        for strategy in [DataStrategy::Common, DataStrategy::Dump, DataStrategy::SchemaOnly] {
            let config = config(strategy);
            let mut i = input(&config);
            i.acid = true;
            assert_eq!(route(&i), strategy);
        }
    }

    #[test]
    fn test_orphan_rule() {
        let config = config(DataStrategy::SchemaOnly);
        let mut i = input(&config);
        i.left_exists = false;
        i.right_exists = true;
        let decision = resolve(&i);
        assert_eq!(decision.action, TableAction::Orphan);
        assert_eq!(decision.right_create, CreateStrategy::Nothing);
    }

    #[test]
    fn test_existing_target_without_sync_is_rejected() {
        let config = config(DataStrategy::Common);
        let mut i = input(&config);
        i.right_exists = true;
        i.schema_matches = true;
        assert_eq!(
            resolve(&i).action,
            TableAction::Reject {
                message: SCHEMA_EXISTS_NO_ACTION.to_string(),
                skipped: true
            }
        );
    }

    #[test]
    fn test_existing_target_with_sync() {
        let mut config = config(DataStrategy::SchemaOnly);
        config.sync = true;
        let mut i = input(&config);
        i.right_exists = true;
        i.schema_matches = true;
        let decision = resolve(&i);
        assert_eq!(decision.action, TableAction::Leave);
        assert_eq!(decision.right_create, CreateStrategy::Leave);

        i.schema_matches = false;
        let decision = resolve(&i);
        assert_eq!(decision.action, TableAction::Migrate);
        assert_eq!(decision.right_create, CreateStrategy::Replace);

        i.right_purges = true;
        assert!(matches!(resolve(&i).action, TableAction::Reject { skipped: false, .. }));
    }

    #[test]
    fn test_existing_target_read_only_refuses_replace() {
        let mut config = config(DataStrategy::Sql);
        config.sync = true;
        config.read_only = true;
        let mut i = input(&config);
        i.right_exists = true;
        assert_eq!(
            resolve(&i).action,
            TableAction::Reject {
                message: SCHEMA_EXISTS_READ_ONLY.to_string(),
                skipped: false
            }
        );
    }

    #[test]
    fn test_left_only_strategies_ignore_right() {
        let config = config(DataStrategy::Dump);
        let mut i = input(&config);
        i.right_exists = true;
        let decision = resolve(&i);
        assert_eq!(decision.action, TableAction::Migrate);
        assert_eq!(decision.right_create, CreateStrategy::Nothing);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let config = config(DataStrategy::Hybrid);
        let mut i = input(&config);
        i.partitioned = true;
        assert_eq!(resolve(&i), resolve(&i));
    }
}
