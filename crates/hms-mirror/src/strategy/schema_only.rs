use crate::core::Environment;
use crate::hive::statement as sql;
use crate::pipeline::{Plan, Stage, StageFlow, StageResult, TableJob, TablePipeline};
use crate::strategy::context::DatabaseContext;
use crate::strategy::shared::{
    build_target_definition, create_target, evaluate, missing, table_kind, target_is_external,
};

const STAGES: &[Stage] = &[
    Stage::Evaluate,
    Stage::BuildTargetDefinition,
    Stage::TranslateLocations,
    Stage::BuildTargetSql,
];

/// Recreate LEFT's schema on RIGHT at the translated location. No data moves.
pub struct SchemaOnlyPipeline;

impl TablePipeline for SchemaOnlyPipeline {
    fn name(&self) -> &'static str {
        "schema-only"
    }

    fn stages(&self) -> &'static [Stage] {
        STAGES
    }

    fn execute(&self, stage: Stage, job: &mut TableJob, plan: &mut Plan, ctx: &DatabaseContext) -> StageResult {
        match stage {
            Stage::Evaluate => evaluate(job),
            Stage::BuildTargetDefinition => {
                build_target_definition(job, plan);
                Ok(StageFlow::Continue)
            }
            Stage::TranslateLocations => {
                let left = job.table.left();
                let external = target_is_external(left, job.decision.downgrade);
                let location = if external {
                    ctx.translator
                        .table_location(left.location.as_deref(), &job.table.name, table_kind(external))
                } else {
                    None
                };
                let def = plan.target.as_mut().ok_or_else(|| missing(job, "target definition"))?;
                if let Some(location) = &location {
                    def.set_location(location);
                }
                job.table.env_mut(Environment::Right).location = location.clone();
                plan.target_location = location;
                Ok(StageFlow::Continue)
            }
            Stage::BuildTargetSql => {
                create_target(job, plan, ctx)?;
                let external = plan.target.as_ref().is_some_and(|d| d.is_external());
                if external && job.table.left().partitioned {
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
