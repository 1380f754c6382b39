//! Migration strategies.
//!
//! The [`resolver`] decides what happens to a table; [`pipeline_for`] picks
//! the [`TablePipeline`] that generates its SQL. Database statements are
//! built separately by [`database::build_database_sql`].

pub mod context;
pub mod database;
pub mod filter;
pub mod resolver;

mod common;
mod dump;
mod export_import;
mod noop;
mod schema_only;
mod shared;
mod sql;
mod storage_migration;

pub use common::CommonPipeline;
pub use context::DatabaseContext;
pub use dump::DumpPipeline;
pub use export_import::ExportImportPipeline;
pub use filter::TableFilter;
pub use noop::NoOpPipeline;
pub use resolver::{resolve, Decision, DecisionInput, TableAction};
pub use schema_only::SchemaOnlyPipeline;
pub use sql::SqlPipeline;
pub use storage_migration::StorageMigrationPipeline;

use crate::config::DataStrategy;
use crate::pipeline::TablePipeline;

/// Pipeline that carries out `decision`.
pub fn pipeline_for(decision: &Decision) -> &'static dyn TablePipeline {
    if matches!(decision.action, TableAction::Leave | TableAction::Orphan) {
        return &NoOpPipeline;
    }
    match decision.strategy {
        DataStrategy::SchemaOnly => &SchemaOnlyPipeline,
        DataStrategy::Common => &CommonPipeline,
        DataStrategy::Dump => &DumpPipeline,
        DataStrategy::ExportImport => &ExportImportPipeline,
        DataStrategy::Sql | DataStrategy::Acid | DataStrategy::Hybrid => &SqlPipeline,
        DataStrategy::StorageMigration => &StorageMigrationPipeline,
    }
}
