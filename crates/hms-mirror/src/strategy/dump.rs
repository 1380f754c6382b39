use crate::config::DumpPartitionMode;
use crate::core::{Environment, PhaseState};
use crate::hive::statement as sql;
use crate::pipeline::{Plan, Stage, StageFlow, StageResult, TableJob, TablePipeline};
use crate::strategy::context::DatabaseContext;
use crate::strategy::shared::{evaluate, missing, select_db};

const STAGES: &[Stage] = &[
    Stage::Evaluate,
    Stage::BuildSourceDefinition,
    Stage::BuildSourceSql,
    Stage::PartitionSql,
];

pub const ACID_PARTITIONS_ISSUE: &str =
    "ACID table partitions are tracked by the metastore. No partition statements were generated.";
pub const NO_PARTITIONS_LISTED_ISSUE: &str =
    "No partitions were discovered for this table. Falling back to MSCK REPAIR.";

/// Capture LEFT's schema as a replayable script on LEFT.
pub struct DumpPipeline;

impl TablePipeline for DumpPipeline {
    fn name(&self) -> &'static str {
        "dump"
    }

    fn stages(&self) -> &'static [Stage] {
        STAGES
    }

    fn terminal_state(&self) -> PhaseState {
        PhaseState::Processed
    }

    fn execute(&self, stage: Stage, job: &mut TableJob, plan: &mut Plan, ctx: &DatabaseContext) -> StageResult {
        match stage {
            Stage::Evaluate => evaluate(job),
            Stage::BuildSourceDefinition => {
                plan.target = Some(job.table.left().table_definition());
                plan.target_location = job.table.left().location.clone();
                Ok(StageFlow::Continue)
            }
            Stage::BuildSourceSql => {
                let def = plan.target.as_ref().ok_or_else(|| missing(job, "source definition"))?;
                let left = job.table.env_mut(Environment::Left);
                select_db(left, &ctx.source_db);
                left.add_sql(sql::CREATE_TABLE_DESC, def.sql());
                Ok(StageFlow::Continue)
            }
            Stage::PartitionSql => {
                partition_sql(job, ctx.config.dump.partition_mode);
                Ok(StageFlow::Continue)
            }
            _ => Ok(StageFlow::Continue),
        }
    }
}

fn partition_sql(job: &mut TableJob, mode: DumpPartitionMode) {
    let name = job.table.name.clone();
    let left = job.table.env_mut(Environment::Left);
    if !left.partitioned {
        return;
    }
    if left.is_acid() {
        left.add_issue(ACID_PARTITIONS_ISSUE);
        return;
    }

    match mode {
        DumpPartitionMode::AddPartitions if !left.partitions.is_empty() => {
            let statements: Vec<_> = left
                .partitions
                .iter()
                .map(|(spec, location)| sql::add_partition(&name, spec, location))
                .collect();
            for statement in statements {
                left.add_sql(sql::ADD_PARTITION_DESC, statement);
            }
        }
        DumpPartitionMode::AddPartitions => {
            left.add_issue(NO_PARTITIONS_LISTED_ISSUE);
            left.add_sql(sql::MSCK_REPAIR_DESC, sql::msck_repair(&name));
        }
        DumpPartitionMode::Msck => {
            left.add_sql(sql::MSCK_REPAIR_DESC, sql::msck_repair(&name));
        }
    }
}
