use crate::core::Environment;
use crate::hive::statement as sql;
use crate::pipeline::{Plan, Stage, StageFlow, StageResult, TableJob, TablePipeline};
use crate::strategy::context::DatabaseContext;
use crate::strategy::shared::{build_target_definition, create_target, evaluate, missing};

const STAGES: &[Stage] = &[
    Stage::Evaluate,
    Stage::BuildTargetDefinition,
    Stage::BuildTargetSql,
    Stage::RepairPartitions,
];

/// Both clusters share storage: RIGHT's table points at LEFT's data in place.
pub struct CommonPipeline;

impl TablePipeline for CommonPipeline {
    fn name(&self) -> &'static str {
        "common"
    }

    fn stages(&self) -> &'static [Stage] {
        STAGES
    }

    fn execute(&self, stage: Stage, job: &mut TableJob, plan: &mut Plan, ctx: &DatabaseContext) -> StageResult {
        match stage {
            Stage::Evaluate => evaluate(job),
            Stage::BuildTargetDefinition => {
                build_target_definition(job, plan);
                let location = job.table.left().location.clone();
                let def = plan.target.as_mut().ok_or_else(|| missing(job, "target definition"))?;
                if let Some(location) = &location {
                    def.set_location(location);
                }
                job.table.env_mut(Environment::Right).location = location.clone();
                plan.target_location = location;
                Ok(StageFlow::Continue)
            }
            Stage::BuildTargetSql => create_target(job, plan, ctx),
            Stage::RepairPartitions => {
                if job.table.left().partitioned {
                    let name = job.table.name.clone();
                    job.table
                        .env_mut(Environment::Right)
                        .add_sql(sql::MSCK_REPAIR_DESC, sql::msck_repair(&name));
                }
                Ok(StageFlow::Continue)
            }
            _ => Ok(StageFlow::Continue),
        }
    }
}
