//! HiveQL generation helpers.
//!
//! - [`definition`]: editing `SHOW CREATE TABLE` output
//! - [`statement`]: statement templates and step descriptions
//! - [`location`]: namespace and warehouse rewriting

pub mod definition;
pub mod location;
pub mod statement;

pub use definition::TableDefinition;
pub use location::{LocationTranslator, TableKind, Warehouse};
