//! Per-stage configuration derived from CLI arguments.
//!
//! The pipeline keeps one root configuration with the directory layout
//! and modelling knobs; each stage reads the slice it needs. All
//! numeric knobs are validated before any stage runs.

use std::path::{Path, PathBuf};

use crate::error::StageError;
use crate::model::binning::BinningSettings;
use crate::model::logistic::LogisticParams;
use crate::model::scorecard::ScalingParams;
use crate::schema::TARGET_COLUMN;

/// Default filename of the raw dataset inside the source directory.
pub const DEFAULT_RAW_FILE: &str = "credit_risk.csv";

/// Root configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root directory for all per-stage artifacts
    pub artifacts_dir: PathBuf,
    /// Directory the raw dataset is acquired from
    pub source_dir: PathBuf,
    /// Expected raw dataset filename
    pub raw_file_name: String,
    /// Name of the binary target column
    pub target_column: String,
    /// Fraction of the development set held out as test
    pub test_size: f64,
    /// Fraction of the full dataset held out as out-of-time
    pub oot_size: f64,
    /// Seed for the stratified shuffles
    pub seed: u64,
    /// Binning knobs
    pub binning: BinningSettings,
    /// Logistic estimator hyperparameters
    pub estimator: LogisticParams,
    /// Score scaling parameters
    pub scaling: ScalingParams,
    /// Stable export directory for the deployed model
    pub export_dir: PathBuf,
    /// Root directory for experiment-tracking runs
    pub tracking_dir: PathBuf,
    /// Experiment run name prefix
    pub run_name: String,
}

impl PipelineConfig {
    /// Configuration rooted at a workspace directory, with the
    /// defaults used throughout the test-suite and CLI.
    pub fn with_root(root: &Path, source_dir: PathBuf) -> Self {
        Self {
            artifacts_dir: root.join("artifacts"),
            source_dir,
            raw_file_name: DEFAULT_RAW_FILE.to_string(),
            target_column: TARGET_COLUMN.to_string(),
            test_size: 0.2,
            oot_size: 0.2,
            seed: 42,
            binning: BinningSettings::default(),
            estimator: LogisticParams::default(),
            scaling: ScalingParams::default(),
            export_dir: root.join("export"),
            tracking_dir: root.join("runs"),
            run_name: "scorecard".to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), StageError> {
        for (name, value) in [("test_size", self.test_size), ("oot_size", self.oot_size)] {
            if !(0.0 < value && value < 1.0) {
                return Err(StageError::InvalidConfig {
                    message: format!("{} must lie in (0, 1), got {}", name, value),
                });
            }
        }
        if self.binning.max_bins < 2 {
            return Err(StageError::InvalidConfig {
                message: format!("max_bins must be at least 2, got {}", self.binning.max_bins),
            });
        }
        if self.binning.pre_bins < self.binning.max_bins {
            return Err(StageError::InvalidConfig {
                message: format!(
                    "pre_bins ({}) must not be below max_bins ({})",
                    self.binning.pre_bins, self.binning.max_bins
                ),
            });
        }
        self.estimator.validate()?;
        self.scaling.validate()?;
        Ok(())
    }

    // Stage directory layout

    pub fn raw_data_dir(&self) -> PathBuf {
        self.artifacts_dir.join("data_ingestion")
    }

    pub fn validation_dir(&self) -> PathBuf {
        self.artifacts_dir.join("data_validation")
    }

    pub fn transformation_dir(&self) -> PathBuf {
        self.artifacts_dir.join("data_transformation")
    }

    pub fn trainer_dir(&self) -> PathBuf {
        self.artifacts_dir.join("model_trainer")
    }

    pub fn evaluation_dir(&self) -> PathBuf {
        self.artifacts_dir.join("model_evaluation")
    }

    // Artifact JSON locations

    pub fn ingestion_artifact_path(&self) -> PathBuf {
        self.raw_data_dir().join("ingestion_artifact.json")
    }

    pub fn validation_artifact_path(&self) -> PathBuf {
        self.validation_dir().join("validation_artifact.json")
    }

    pub fn transformation_artifact_path(&self) -> PathBuf {
        self.transformation_dir().join("transformation_artifact.json")
    }

    pub fn trainer_artifact_path(&self) -> PathBuf {
        self.trainer_dir().join("trainer_artifact.json")
    }

    pub fn evaluation_artifact_path(&self) -> PathBuf {
        self.evaluation_dir().join("evaluation_artifact.json")
    }

    pub fn pusher_artifact_path(&self) -> PathBuf {
        self.export_dir.join("pusher_artifact.json")
    }

    pub fn tracking_run_path(&self) -> PathBuf {
        self.trainer_dir().join("tracking_run.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PipelineConfig {
        PipelineConfig::with_root(Path::new("/tmp/work"), PathBuf::from("/tmp/source"))
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_fractions() {
        let mut cfg = config();
        cfg.test_size = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = config();
        cfg.oot_size = 1.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_inconsistent_binning() {
        let mut cfg = config();
        cfg.binning.max_bins = 1;
        assert!(cfg.validate().is_err());

        let mut cfg = config();
        cfg.binning.pre_bins = 3;
        cfg.binning.max_bins = 5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_stage_directories_nest_under_artifacts() {
        let cfg = config();
        assert!(cfg.raw_data_dir().starts_with(&cfg.artifacts_dir));
        assert!(cfg.transformation_dir().starts_with(&cfg.artifacts_dir));
        assert!(cfg.trainer_artifact_path().starts_with(&cfg.artifacts_dir));
    }
}
