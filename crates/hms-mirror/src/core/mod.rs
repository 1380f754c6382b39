//! Data model of a conversion job.
//!
//! - [`environment`]: one table as seen from one cluster role
//! - [`mirror`]: one table across its environments, with phase bookkeeping
//! - [`database`]: database DDL and the table map
//! - [`conversion`]: the job root and its return code
//! - [`identifier`]: identifier validation and HiveQL quoting
//!
//! Ownership is strictly top-down: the result owns its databases, a database
//! owns its tables, a table owns its environments. Relations between tables
//! (a table existing on RIGHT only, for instance) are plain data.

pub mod conversion;
pub mod database;
pub mod environment;
pub mod identifier;
pub mod mirror;
pub mod phase;

pub use conversion::{ConversionResult, EnvironmentContext};
pub use database::{DBMirror, DatabaseEnvironment};
pub use environment::{CreateStrategy, Environment, EnvironmentTable, SqlPair};
pub use mirror::{Environments, TableMirror};
pub use phase::PhaseState;
