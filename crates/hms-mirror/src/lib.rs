//! # hms-mirror
//!
//! Hive metastore migration planning library.
//!
//! Given discovered table metadata for a source ("LEFT") and a target
//! ("RIGHT") cluster, this library decides how every table migrates and
//! generates the ordered HiveQL each side has to run:
//!
//! - **Strategy resolution** as an ordered list of pure rules
//! - **SQL generation** per strategy: schema only, common storage, dump,
//!   EXPORT/IMPORT, SQL through shadow and transfer tables, ACID, storage
//!   migration
//! - **Phase tracking** per table with a fixed stage pipeline per strategy
//! - **Parallel planning** with a configurable worker pool
//! - **Reports** and per-side execute/cleanup scripts
//!
//! The library never connects to a metastore and never runs the SQL it
//! produces.
//!
//! ## Example
//!
//! ```rust,no_run
//! use hms_mirror::{Config, InventoryFile, Orchestrator};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> hms_mirror::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let inventory = InventoryFile::load("inventory.yaml").await?;
//!     let result = Orchestrator::new(config)
//!         .run(&inventory, CancellationToken::new())
//!         .await?;
//!     println!("Planned {} tables, return code {}", result.table_count(), result.return_code());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod hive;
pub mod inventory;
pub mod orchestrator;
pub mod pipeline;
pub mod report;
pub mod strategy;

// Re-exports for convenient access
pub use config::{Config, DataStrategy, ValidationCode};
pub use core::{
    ConversionResult, CreateStrategy, DBMirror, Environment, EnvironmentTable, PhaseState,
    SqlPair, TableMirror,
};
pub use error::{JobValidationFailure, MirrorError, Result, TableError};
pub use inventory::{InventoryFile, MetadataSource};
pub use orchestrator::{Orchestrator, ProgressUpdate};
pub use pipeline::{TableJob, TablePipeline};
pub use strategy::{Decision, TableAction};
