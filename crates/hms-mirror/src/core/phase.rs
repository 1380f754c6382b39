use serde::{Deserialize, Serialize};
use std::fmt;

/// Progress of one table through its strategy pipeline.
///
/// Ordering follows the lifecycle, so a summary sorted by state reads from
/// untouched tables to finished ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseState {
    #[default]
    Init,
    Started,
    CalculatingSql,
    /// SQL was produced; running it is left to an executor.
    CalculatedSql,
    /// Nothing left to do for this table.
    Processed,
    Error,
}

impl PhaseState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PhaseState::CalculatedSql | PhaseState::Processed | PhaseState::Error
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PhaseState::CalculatedSql | PhaseState::Processed)
    }
}

impl fmt::Display for PhaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PhaseState::Init => "INIT",
            PhaseState::Started => "STARTED",
            PhaseState::CalculatingSql => "CALCULATING_SQL",
            PhaseState::CalculatedSql => "CALCULATED_SQL",
            PhaseState::Processed => "PROCESSED",
            PhaseState::Error => "ERROR",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!PhaseState::Init.is_terminal());
        assert!(!PhaseState::CalculatingSql.is_terminal());
        assert!(PhaseState::CalculatedSql.is_terminal());
        assert!(PhaseState::Error.is_terminal());
        assert!(!PhaseState::Error.is_success());
        assert!(PhaseState::Init < PhaseState::Processed);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&PhaseState::CalculatedSql).unwrap(),
            "\"CALCULATED_SQL\""
        );
    }
}
