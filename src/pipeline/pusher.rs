//! Model pusher: deploy the trained scorecard to the export location.
//!
//! Deployment is a copy of the model document into a stable directory
//! the serving path reads from. Re-running overwrites the previous
//! copy, so the stage is idempotent.

use anyhow::{Context, Result};
use std::time::Instant;

use crate::entity::artifacts::{save_artifact, ArtifactFiles, PusherArtifact, TrainerArtifact};
use crate::entity::config::PipelineConfig;
use crate::utils::{print_step_time, print_success};

pub fn run(config: &PipelineConfig, trainer: &TrainerArtifact) -> Result<PusherArtifact> {
    let start = Instant::now();
    trainer.verify_files("pusher")?;

    std::fs::create_dir_all(&config.export_dir)
        .with_context(|| format!("Failed to create directory {}", config.export_dir.display()))?;
    let file_name = trainer
        .trained_model_path
        .file_name()
        .context("trained model path has no file name")?;
    let dest = config.export_dir.join(file_name);
    std::fs::copy(&trainer.trained_model_path, &dest).with_context(|| {
        format!(
            "Failed to deploy model {} to {}",
            trainer.trained_model_path.display(),
            dest.display()
        )
    })?;

    let artifact = PusherArtifact {
        pushed_model_path: dest,
    };
    artifact.verify_files("pusher")?;
    save_artifact(&config.pusher_artifact_path(), &artifact)?;

    print_success(&format!(
        "Model deployed to {}",
        artifact.pushed_model_path.display()
    ));
    print_step_time(start.elapsed());
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_push_copies_model_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("scorecard.json");
        std::fs::write(&model, "{\"v\":1}").unwrap();

        let config = PipelineConfig::with_root(dir.path(), dir.path().to_path_buf());
        let trainer = TrainerArtifact {
            trained_model_path: model.clone(),
        };

        let first = run(&config, &trainer).unwrap();
        assert!(first.pushed_model_path.exists());
        assert!(first.pushed_model_path.starts_with(&config.export_dir));

        std::fs::write(&model, "{\"v\":2}").unwrap();
        let second = run(&config, &trainer).unwrap();
        assert_eq!(first.pushed_model_path, second.pushed_model_path);
        let deployed = std::fs::read_to_string(&second.pushed_model_path).unwrap();
        assert!(deployed.contains("\"v\":2"));
    }

    #[test]
    fn test_push_requires_trained_model() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::with_root(dir.path(), dir.path().to_path_buf());
        let trainer = TrainerArtifact {
            trained_model_path: PathBuf::from("/nonexistent/scorecard.json"),
        };
        assert!(run(&config, &trainer).is_err());
    }
}
