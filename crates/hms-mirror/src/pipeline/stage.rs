use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::PhaseState;
use crate::error::TableError;
use crate::hive::TableDefinition;

/// One step of a strategy pipeline. Each executed stage is one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Evaluate,
    Finalize,
    PartitionLimit,
    ResolveWorkingPaths,
    BuildSourceDefinition,
    BuildTargetDefinition,
    TransferDefinition,
    ShadowDefinition,
    TranslateLocations,
    BuildSourceSql,
    BuildTargetSql,
    PartitionSql,
    RepairPartitions,
    ExportSql,
    ImportSql,
    TransferSql,
    ShadowSql,
    DataMovement,
    Cleanup,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Evaluate => "evaluate",
            Stage::Finalize => "finalize",
            Stage::PartitionLimit => "partition limit",
            Stage::ResolveWorkingPaths => "resolve working paths",
            Stage::BuildSourceDefinition => "build source definition",
            Stage::BuildTargetDefinition => "build target definition",
            Stage::TransferDefinition => "transfer definition",
            Stage::ShadowDefinition => "shadow definition",
            Stage::TranslateLocations => "translate locations",
            Stage::BuildSourceSql => "build source SQL",
            Stage::BuildTargetSql => "build target SQL",
            Stage::PartitionSql => "partition SQL",
            Stage::RepairPartitions => "repair partitions",
            Stage::ExportSql => "export SQL",
            Stage::ImportSql => "import SQL",
            Stage::TransferSql => "transfer SQL",
            Stage::ShadowSql => "shadow SQL",
            Stage::DataMovement => "data movement",
            Stage::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How the pipeline continues after a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageFlow {
    Continue,
    /// Stop early in the given terminal state.
    Done(PhaseState),
}

pub type StageResult = std::result::Result<StageFlow, TableError>;

/// Artifacts handed from one stage to the next while a table is built.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    /// Definition of the table created on the target (or recreated on LEFT).
    pub target: Option<TableDefinition>,
    pub target_location: Option<String>,
    pub shadow: Option<TableDefinition>,
    pub transfer: Option<TableDefinition>,
    pub working_path: Option<String>,
}
