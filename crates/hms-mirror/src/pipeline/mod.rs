//! Table pipeline abstractions using the Template Method pattern.
//!
//! - [`TablePipeline`]: trait defining the stage-by-stage skeleton
//! - [`TableJob`]: Command pattern bundling a table with its decision
//! - [`Stage`] / [`Plan`]: stage identifiers and the artifacts passed between
//!   stages
//!
//! The pipeline separates concerns:
//! - **What** to plan (TableJob)
//! - **How** each strategy plans it (TablePipeline implementations in
//!   `strategy`)

mod job;
mod stage;
mod template;

pub use job::{JobResult, TableJob};
pub use stage::{Plan, Stage, StageFlow, StageResult};
pub use template::{ProgressTracker, TablePipeline};
