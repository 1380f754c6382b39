//! Error types for the conversion engine.
//!
//! Three kinds of failure exist:
//!
//! - [`MirrorError`]: infrastructure failures (bad config file, unreadable
//!   inventory, serialization). These abort the caller.
//! - [`JobValidationFailure`]: invalid flag combinations detected before any
//!   table work. Recorded on the job result, encoded as a negative bitset.
//! - [`TableError`]: fatal for one table's pipeline only.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ValidationCode;
use crate::core::Environment;

/// Main error type for engine operations.
#[derive(Error, Debug)]
pub enum MirrorError {
    /// Configuration error (invalid YAML values, malformed namespaces, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Discovered metadata could not be used.
    #[error("Inventory error: {0}")]
    Inventory(String),

    /// Flag combinations rejected by the validation gate.
    #[error(transparent)]
    Validation(#[from] JobValidationFailure),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MirrorError {
    /// Create an Inventory error.
    pub fn inventory(message: impl Into<String>) -> Self {
        MirrorError::Inventory(message.into())
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            MirrorError::Config(_) | MirrorError::Yaml(_) => 2,
            MirrorError::Inventory(_) => 3,
            MirrorError::Validation(failure) => (failure.return_code().rem_euclid(256)) as u8,
            MirrorError::Io(_) | MirrorError::Json(_) => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Job-level validation failure: one entry per violated rule.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("Configuration validation failed: {}", describe(.codes))]
pub struct JobValidationFailure {
    pub codes: Vec<ValidationCode>,
}

fn describe(codes: &[ValidationCode]) -> String {
    codes
        .iter()
        .map(|c| format!("[{:?}] {}", c, c.message()))
        .collect::<Vec<_>>()
        .join("; ")
}

impl JobValidationFailure {
    pub fn new(codes: Vec<ValidationCode>) -> Self {
        Self { codes }
    }

    /// Bitset of the violated rules.
    pub fn bitset(&self) -> i64 {
        self.codes.iter().fold(0, |acc, code| acc | code.bit())
    }

    /// Job return code: the negated bitset.
    pub fn return_code(&self) -> i64 {
        -self.bitset()
    }
}

/// Fatal condition that stops one table's pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{table} [{side}]: {message}")]
pub struct TableError {
    pub table: String,
    pub side: Environment,
    pub message: String,
}

impl TableError {
    pub fn new(table: impl Into<String>, side: Environment, message: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            side,
            message: message.into(),
        }
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, MirrorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_bitset_combines_codes() {
        let failure = JobValidationFailure::new(vec![
            ValidationCode::AcidDowngradeInPlace,
            ValidationCode::DowngradeWithoutAcid,
        ]);
        assert_eq!(failure.bitset(), 0b11);
        assert_eq!(failure.return_code(), -3);
    }

    #[test]
    fn test_format_detailed_includes_message() {
        let err = MirrorError::Config("bad namespace".into());
        assert!(err.format_detailed().contains("bad namespace"));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_table_error_display() {
        let err = TableError::new("web_sales", Environment::Right, "boom");
        assert_eq!(err.to_string(), "web_sales [RIGHT]: boom");
    }
}
