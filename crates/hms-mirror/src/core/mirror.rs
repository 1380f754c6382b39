//! One table across all of its environments, plus its phase bookkeeping.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::environment::{Environment, EnvironmentTable};
use super::phase::PhaseState;
use crate::config::DataStrategy;
use crate::error::TableError;

/// The four views of a table. SHADOW and TRANSFER only exist for strategies
/// that stage data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Environments {
    pub left: EnvironmentTable,
    pub right: EnvironmentTable,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<EnvironmentTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer: Option<EnvironmentTable>,
}

impl Environments {
    pub fn get(&self, env: Environment) -> Option<&EnvironmentTable> {
        match env {
            Environment::Left => Some(&self.left),
            Environment::Right => Some(&self.right),
            Environment::Shadow => self.shadow.as_ref(),
            Environment::Transfer => self.transfer.as_ref(),
        }
    }

    pub fn get_mut(&mut self, env: Environment) -> Option<&mut EnvironmentTable> {
        match env {
            Environment::Left => Some(&mut self.left),
            Environment::Right => Some(&mut self.right),
            Environment::Shadow => self.shadow.as_mut(),
            Environment::Transfer => self.transfer.as_mut(),
        }
    }

    /// Present environments in LEFT, RIGHT, SHADOW, TRANSFER order.
    pub fn iter(&self) -> impl Iterator<Item = (Environment, &EnvironmentTable)> {
        [
            (Environment::Left, Some(&self.left)),
            (Environment::Right, Some(&self.right)),
            (Environment::Shadow, self.shadow.as_ref()),
            (Environment::Transfer, self.transfer.as_ref()),
        ]
        .into_iter()
        .filter_map(|(env, table)| table.map(|t| (env, t)))
    }
}

/// A table's migration plan and progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableMirror {
    pub name: String,
    #[serde(default)]
    pub strategy: Option<DataStrategy>,
    #[serde(default)]
    pub phase_state: PhaseState,
    #[serde(default)]
    pub current_phase: usize,
    #[serde(default)]
    pub total_phase_count: usize,
    #[serde(default)]
    pub stage_duration: Duration,
    pub environments: Environments,
}

impl TableMirror {
    pub fn new(name: impl Into<String>, left: EnvironmentTable, right: EnvironmentTable) -> Self {
        Self {
            name: name.into(),
            environments: Environments {
                left,
                right,
                shadow: None,
                transfer: None,
            },
            ..Default::default()
        }
    }

    pub fn left(&self) -> &EnvironmentTable {
        &self.environments.left
    }

    pub fn right(&self) -> &EnvironmentTable {
        &self.environments.right
    }

    pub fn env(&self, env: Environment) -> Option<&EnvironmentTable> {
        self.environments.get(env)
    }

    /// Mutable access to a side, creating SHADOW/TRANSFER on first use.
    pub fn env_mut(&mut self, env: Environment) -> &mut EnvironmentTable {
        match env {
            Environment::Left => &mut self.environments.left,
            Environment::Right => &mut self.environments.right,
            Environment::Shadow => self.environments.shadow.get_or_insert_with(Default::default),
            Environment::Transfer => self
                .environments
                .transfer
                .get_or_insert_with(Default::default),
        }
    }

    pub fn add_issue(&mut self, env: Environment, issue: impl Into<String>) {
        self.env_mut(env).add_issue(issue);
    }

    pub fn has_errors(&self) -> bool {
        self.environments.iter().any(|(_, t)| t.has_errors())
    }

    pub fn is_terminal(&self) -> bool {
        self.phase_state.is_terminal()
    }

    /// Enter the pipeline. Returns false when the table already finished.
    pub fn start(&mut self, total_phase_count: usize) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.phase_state = PhaseState::Started;
        self.current_phase = 0;
        self.total_phase_count = total_phase_count;
        true
    }

    /// Begin the next stage. Returns false when no further stage may run.
    pub fn enter_phase(&mut self) -> bool {
        if self.is_terminal() || self.current_phase >= self.total_phase_count {
            return false;
        }
        self.current_phase += 1;
        self.phase_state = PhaseState::CalculatingSql;
        true
    }

    /// Move to a terminal state. Terminal states never change afterwards.
    pub fn finish(&mut self, state: PhaseState) {
        if self.is_terminal() || !state.is_terminal() {
            return;
        }
        self.phase_state = state;
    }

    /// Record a fatal error on its side and end the pipeline.
    pub fn fail(&mut self, error: TableError) {
        self.env_mut(error.side).add_error(error.message);
        self.finish(PhaseState::Error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mirror() -> TableMirror {
        let left = EnvironmentTable {
            exists: true,
            ..EnvironmentTable::named("web_sales")
        };
        TableMirror::new("web_sales", left, EnvironmentTable::named("web_sales"))
    }

    #[test]
    fn test_new_mirror_is_init_without_staging_sides() {
        let table = mirror();
        assert_eq!(table.phase_state, PhaseState::Init);
        assert!(table.strategy.is_none());
        assert!(table.env(Environment::Shadow).is_none());
        assert_eq!(table.environments.iter().count(), 2);
    }

    #[test]
    fn test_phases_advance_monotonically_up_to_total() {
        let mut table = mirror();
        assert!(table.start(2));
        assert!(table.enter_phase());
        assert!(table.enter_phase());
        assert!(!table.enter_phase());
        assert_eq!(table.current_phase, 2);
        assert_eq!(table.phase_state, PhaseState::CalculatingSql);
    }

    #[test]
    fn test_terminal_state_is_sticky() {
        let mut table = mirror();
        table.start(4);
        table.enter_phase();
        table.fail(TableError::new("web_sales", Environment::Right, "boom"));
        assert_eq!(table.phase_state, PhaseState::Error);
        assert_eq!(table.right().errors, vec!["boom"]);

        table.finish(PhaseState::Processed);
        assert!(!table.start(4));
        assert!(!table.enter_phase());
        assert_eq!(table.phase_state, PhaseState::Error);
        assert_eq!(table.current_phase, 1);
    }

    #[test]
    fn test_env_mut_creates_staging_side() {
        let mut table = mirror();
        table.env_mut(Environment::Shadow).name = "hms_mirror_shadow_web_sales".into();
        assert_eq!(
            table.env(Environment::Shadow).map(|t| t.name.as_str()),
            Some("hms_mirror_shadow_web_sales")
        );
        assert_eq!(table.environments.iter().count(), 3);
    }
}
