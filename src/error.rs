//! Domain error types for the scorecard pipeline.
//!
//! Stage-level failures that have a precise, recoverable meaning are
//! modeled here; everything else propagates as `anyhow::Error` with
//! context naming the originating stage. No stage retries - a failed
//! stage is fatal to the run and must be re-triggered externally.

use std::path::PathBuf;
use thiserror::Error;

/// Precondition and contract failures raised by pipeline stages.
#[derive(Debug, Error)]
pub enum StageError {
    /// An input file referenced by a prior stage's artifact is absent.
    #[error("{stage}: required input file not found: {path}")]
    MissingInput { stage: &'static str, path: PathBuf },

    /// A column the stage depends on is not present in the dataset.
    #[error("{stage}: required column '{column}' not found in dataset")]
    MissingColumn { stage: &'static str, column: String },

    /// The target column cannot support a stratified split.
    #[error(
        "stratified split impossible: target class {class} has only {count} row(s) (need at least 2)"
    )]
    DegenerateStratification { class: i64, count: usize },

    /// The target column is not binary 0/1.
    #[error("target column '{column}' must be binary 0/1, found values {values:?}")]
    NonBinaryTarget { column: String, values: Vec<f64> },

    /// Schema validation failed; details are in the written report.
    #[error("schema validation failed, see report at {report}")]
    SchemaMismatch { report: PathBuf },

    /// The deployed model could not be loaded at serving time.
    #[error("deployed model could not be loaded from {path}: {reason}")]
    ModelUnavailable { path: PathBuf, reason: String },

    /// Serving-time columns do not match the training feature set.
    #[error(
        "input columns do not match training schema: missing {missing:?}, unexpected {unexpected:?}"
    )]
    ColumnSetMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    /// A probability outside [0, 1] (or non-finite) was supplied where
    /// a valid default probability is required.
    #[error("default probability must lie in [0, 1], got {value}")]
    InvalidProbability { value: f64 },

    /// A configuration value fails its validity constraint.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_display() {
        let err = StageError::MissingInput {
            stage: "transformation",
            path: PathBuf::from("artifacts/raw/credit.csv"),
        };
        assert_eq!(
            err.to_string(),
            "transformation: required input file not found: artifacts/raw/credit.csv"
        );
    }

    #[test]
    fn test_degenerate_stratification_display() {
        let err = StageError::DegenerateStratification { class: 1, count: 1 };
        assert!(err.to_string().contains("class 1"));
        assert!(err.to_string().contains("only 1 row"));
    }

    #[test]
    fn test_invalid_probability_display() {
        let err = StageError::InvalidProbability { value: 1.5 };
        assert_eq!(err.to_string(), "default probability must lie in [0, 1], got 1.5");
    }

    #[test]
    fn test_column_set_mismatch_display() {
        let err = StageError::ColumnSetMismatch {
            missing: vec!["age".to_string()],
            unexpected: vec!["zip_code".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("age"));
        assert!(msg.contains("zip_code"));
    }
}
