//! Data ingestion: acquire the raw dataset into the artifact store.
//!
//! The raw CSV is copied from the configured source directory into the
//! ingestion stage directory so every downstream stage works from an
//! immutable snapshot rather than the live source file.

use anyhow::{Context, Result};
use std::time::Instant;

use crate::entity::artifacts::{save_artifact, ArtifactFiles, IngestionArtifact};
use crate::entity::config::PipelineConfig;
use crate::error::StageError;
use crate::utils::{print_info, print_step_time, print_success};

pub fn run(config: &PipelineConfig) -> Result<IngestionArtifact> {
    let start = Instant::now();

    let source = config.source_dir.join(&config.raw_file_name);
    if !source.is_file() {
        return Err(StageError::MissingInput {
            stage: "ingestion",
            path: source,
        }
        .into());
    }

    let raw_dir = config.raw_data_dir();
    std::fs::create_dir_all(&raw_dir)
        .with_context(|| format!("Failed to create directory {}", raw_dir.display()))?;
    let dest = raw_dir.join(&config.raw_file_name);
    std::fs::copy(&source, &dest).with_context(|| {
        format!(
            "Failed to copy {} to {}",
            source.display(),
            dest.display()
        )
    })?;
    print_info(&format!("Acquired {}", source.display()));

    let artifact = IngestionArtifact {
        data_csv_file_path: dest,
    };
    artifact.verify_files("ingestion")?;
    save_artifact(&config.ingestion_artifact_path(), &artifact)?;

    print_success("Raw dataset snapshot ready");
    print_step_time(start.elapsed());
    Ok(artifact)
}
