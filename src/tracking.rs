//! Lightweight local experiment tracking.
//!
//! Training starts a run (run id = run name + timestamp) under a
//! tracking directory and logs hyperparameters plus the model file;
//! evaluation resumes the same run id and appends per-fold metrics.
//! The run id is persisted next to the trainer artifact so both stages
//! append to the same run.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Persisted reference to a tracking run, shared between stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRef {
    pub run_id: String,
}

/// An open tracking run backed by a directory of JSON documents.
#[derive(Debug, Clone)]
pub struct TrackingRun {
    pub run_id: String,
    run_dir: PathBuf,
}

impl TrackingRun {
    /// Start a new run named `<run_name>-<timestamp>`.
    pub fn start(tracking_dir: &Path, run_name: &str) -> Result<Self> {
        let run_id = format!("{}-{}", run_name, Utc::now().format("%Y%m%d-%H%M%S"));
        let run_dir = tracking_dir.join(&run_id);
        std::fs::create_dir_all(&run_dir)
            .with_context(|| format!("Failed to create run directory {}", run_dir.display()))?;
        Ok(Self { run_id, run_dir })
    }

    /// Resume an existing run so a later stage can append to it.
    pub fn resume(tracking_dir: &Path, run_id: &str) -> Result<Self> {
        let run_dir = tracking_dir.join(run_id);
        if !run_dir.is_dir() {
            anyhow::bail!("tracking run '{}' not found under {}", run_id, tracking_dir.display());
        }
        Ok(Self {
            run_id: run_id.to_string(),
            run_dir,
        })
    }

    /// Log key/value hyperparameters, merging with any already logged.
    pub fn log_params<I, K, V>(&self, params: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.merge_into("params.json", params.into_iter().map(|(k, v)| (k.into(), v.into())))
    }

    /// Log scalar metrics, merging with any already logged.
    pub fn log_metrics<I, K>(&self, metrics: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        self.merge_into(
            "metrics.json",
            metrics.into_iter().map(|(k, v)| (k.into(), Value::from(v))),
        )
    }

    /// Copy a file into the run's artifact directory.
    pub fn log_artifact(&self, path: &Path) -> Result<PathBuf> {
        let artifact_dir = self.run_dir.join("artifacts");
        std::fs::create_dir_all(&artifact_dir)
            .with_context(|| format!("Failed to create {}", artifact_dir.display()))?;
        let file_name = path
            .file_name()
            .with_context(|| format!("Artifact path has no file name: {}", path.display()))?;
        let dest = artifact_dir.join(file_name);
        std::fs::copy(path, &dest)
            .with_context(|| format!("Failed to copy artifact {} into run", path.display()))?;
        Ok(dest)
    }

    fn merge_into<I>(&self, file_name: &str, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let path = self.run_dir.join(file_name);
        let mut map: Map<String, Value> = if path.exists() {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            Map::new()
        };
        for (key, value) in entries {
            map.insert(key, value);
        }
        let json = serde_json::to_string_pretty(&Value::Object(map))?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_and_resume_share_directory() {
        let dir = tempfile::tempdir().unwrap();
        let run = TrackingRun::start(dir.path(), "scorecard").unwrap();
        assert!(run.run_id.starts_with("scorecard-"));

        let resumed = TrackingRun::resume(dir.path(), &run.run_id).unwrap();
        assert_eq!(resumed.run_id, run.run_id);
    }

    #[test]
    fn test_resume_unknown_run_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(TrackingRun::resume(dir.path(), "missing-run").is_err());
    }

    #[test]
    fn test_params_and_metrics_merge_across_stages() {
        let dir = tempfile::tempdir().unwrap();
        let run = TrackingRun::start(dir.path(), "scorecard").unwrap();
        run.log_params([("pdo", Value::from(20.0))]).unwrap();

        let resumed = TrackingRun::resume(dir.path(), &run.run_id).unwrap();
        resumed.log_metrics([("train_auc", 0.8), ("psi", 0.02)]).unwrap();
        resumed.log_metrics([("test_auc", 0.75)]).unwrap();

        let metrics: Map<String, Value> = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join(&run.run_id).join("metrics.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(metrics.len(), 3);
        assert!(metrics.contains_key("train_auc"));
        assert!(metrics.contains_key("psi"));
    }

    #[test]
    fn test_log_artifact_copies_file() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("scorecard.json");
        std::fs::write(&model, "{}").unwrap();

        let run = TrackingRun::start(dir.path(), "scorecard").unwrap();
        let dest = run.log_artifact(&model).unwrap();
        assert!(dest.exists());
        assert_eq!(dest.file_name().unwrap(), "scorecard.json");
    }
}
