//! Stage artifacts: immutable records handed between pipeline stages.
//!
//! Each artifact is a flat JSON object whose keys are exactly its
//! attributes, with filesystem paths serialized as plain strings.
//! Every referenced file must exist before the artifact is handed to
//! the next stage; absence is a fatal precondition failure.

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::StageError;

/// Reference to the ingested raw dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionArtifact {
    pub data_csv_file_path: PathBuf,
}

/// Outcome of schema validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationArtifact {
    pub validation_status: bool,
    pub validation_report_file_path: PathBuf,
}

/// Outputs of the transformation stage: the capped dataset, the fitted
/// binning model, and the six split frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformationArtifact {
    pub transformed_csv_file_path: PathBuf,
    pub binning_model_path: PathBuf,
    pub x_train_path: PathBuf,
    pub x_test_path: PathBuf,
    pub x_oot_path: PathBuf,
    pub y_train_path: PathBuf,
    pub y_test_path: PathBuf,
    pub y_oot_path: PathBuf,
}

/// Reference to the trained scorecard model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerArtifact {
    pub trained_model_path: PathBuf,
}

/// Reference to the persisted metrics report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationArtifact {
    pub evaluation_metrics_path: PathBuf,
}

/// Reference to the deployed scorecard copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PusherArtifact {
    pub pushed_model_path: PathBuf,
}

/// Files an artifact references, for the precondition check.
pub trait ArtifactFiles {
    fn referenced_files(&self) -> Vec<&Path>;

    /// Verify every referenced file exists before the next stage runs.
    fn verify_files(&self, stage: &'static str) -> Result<(), StageError> {
        for path in self.referenced_files() {
            if !path.exists() {
                return Err(StageError::MissingInput {
                    stage,
                    path: path.to_path_buf(),
                });
            }
        }
        Ok(())
    }
}

impl ArtifactFiles for IngestionArtifact {
    fn referenced_files(&self) -> Vec<&Path> {
        vec![&self.data_csv_file_path]
    }
}

impl ArtifactFiles for ValidationArtifact {
    fn referenced_files(&self) -> Vec<&Path> {
        vec![&self.validation_report_file_path]
    }
}

impl ArtifactFiles for TransformationArtifact {
    fn referenced_files(&self) -> Vec<&Path> {
        vec![
            &self.transformed_csv_file_path,
            &self.binning_model_path,
            &self.x_train_path,
            &self.x_test_path,
            &self.x_oot_path,
            &self.y_train_path,
            &self.y_test_path,
            &self.y_oot_path,
        ]
    }
}

impl ArtifactFiles for TrainerArtifact {
    fn referenced_files(&self) -> Vec<&Path> {
        vec![&self.trained_model_path]
    }
}

impl ArtifactFiles for EvaluationArtifact {
    fn referenced_files(&self) -> Vec<&Path> {
        vec![&self.evaluation_metrics_path]
    }
}

impl ArtifactFiles for PusherArtifact {
    fn referenced_files(&self) -> Vec<&Path> {
        vec![&self.pushed_model_path]
    }
}

/// Persist an artifact as pretty-printed JSON, creating parent
/// directories as needed.
pub fn save_artifact<T: Serialize>(path: &Path, artifact: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(artifact).context("Failed to serialize artifact")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write artifact to {}", path.display()))?;
    Ok(())
}

/// Load an artifact persisted by a prior stage.
pub fn load_artifact<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read artifact from {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse artifact at {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_json_round_trip_keys() {
        let artifact = TransformationArtifact {
            transformed_csv_file_path: PathBuf::from("a.csv"),
            binning_model_path: PathBuf::from("b.json"),
            x_train_path: PathBuf::from("x_train.csv"),
            x_test_path: PathBuf::from("x_test.csv"),
            x_oot_path: PathBuf::from("x_oot.csv"),
            y_train_path: PathBuf::from("y_train.csv"),
            y_test_path: PathBuf::from("y_test.csv"),
            y_oot_path: PathBuf::from("y_oot.csv"),
        };
        // Struct field order drives the emitted JSON, so the keys
        // appear in declaration order in the serialized text.
        let json = serde_json::to_string(&artifact).unwrap();
        let offsets: Vec<usize> = [
            "transformed_csv_file_path",
            "binning_model_path",
            "x_train_path",
            "x_test_path",
            "x_oot_path",
            "y_train_path",
            "y_test_path",
            "y_oot_path",
        ]
        .iter()
        .map(|key| json.find(&format!("\"{}\"", key)).unwrap_or_else(|| panic!("missing key {}", key)))
        .collect();
        assert!(offsets.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/trainer_artifact.json");
        let artifact = TrainerArtifact {
            trained_model_path: PathBuf::from("model/scorecard.json"),
        };
        save_artifact(&path, &artifact).unwrap();
        let loaded: TrainerArtifact = load_artifact(&path).unwrap();
        assert_eq!(loaded.trained_model_path, artifact.trained_model_path);
    }

    #[test]
    fn test_verify_files_flags_missing_input() {
        let artifact = IngestionArtifact {
            data_csv_file_path: PathBuf::from("/nonexistent/raw.csv"),
        };
        let err = artifact.verify_files("validation").unwrap_err();
        assert!(matches!(err, StageError::MissingInput { stage: "validation", .. }));
    }

    #[test]
    fn test_verify_files_passes_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("raw.csv");
        std::fs::write(&csv, "a,b\n1,2\n").unwrap();
        let artifact = IngestionArtifact {
            data_csv_file_path: csv,
        };
        assert!(artifact.verify_files("validation").is_ok());
    }
}
