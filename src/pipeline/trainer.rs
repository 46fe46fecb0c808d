//! Model training: fit the scorecard on the training partition.
//!
//! The binning fitted during transformation is loaded as a frozen
//! encoding step; only the logistic estimator is fitted here. The
//! trained scorecard is persisted as a JSON document, and a tracking
//! run is opened so evaluation can append its metrics to the same run.

use anyhow::{Context, Result};
use std::time::Instant;

use crate::entity::artifacts::{
    save_artifact, ArtifactFiles, TrainerArtifact, TransformationArtifact,
};
use crate::entity::config::PipelineConfig;
use crate::model::{BinningProcess, Scorecard};
use crate::tracking::{RunRef, TrackingRun};
use crate::utils::{
    create_spinner, extract_binary_target, finish_with_success, load_csv, print_info,
    print_step_time,
};

pub fn run(
    config: &PipelineConfig,
    transformation: &TransformationArtifact,
) -> Result<TrainerArtifact> {
    let start = Instant::now();
    transformation.verify_files("trainer")?;

    let x_train = load_csv(&transformation.x_train_path)?;
    let y_train_df = load_csv(&transformation.y_train_path)?;
    let y_train = extract_binary_target(&y_train_df, &config.target_column, "trainer")?;
    let binning = BinningProcess::load(&transformation.binning_model_path)?;

    let spinner = create_spinner("Fitting logistic scorecard");
    let scorecard = Scorecard::fit(
        &x_train,
        &y_train,
        binning,
        &config.estimator,
        config.scaling,
    )?;
    finish_with_success(
        &spinner,
        &format!(
            "Estimator converged after {} iteration(s)",
            scorecard.estimator.iterations
        ),
    );
    if !scorecard.estimator.converged {
        print_info("Estimator hit the iteration cap before converging");
    }

    let trainer_dir = config.trainer_dir();
    std::fs::create_dir_all(&trainer_dir)
        .with_context(|| format!("Failed to create directory {}", trainer_dir.display()))?;
    let model_path = trainer_dir.join("scorecard.json");
    scorecard.save(&model_path)?;

    let tracking = TrackingRun::start(&config.tracking_dir, &config.run_name)?;
    tracking.log_params([
        ("target_score", config.scaling.target_score),
        ("target_odds", config.scaling.target_odds),
        ("pdo", config.scaling.pdo),
        ("l2", config.estimator.l2),
        ("tol", config.estimator.tol),
    ])?;
    tracking.log_params([
        ("max_iter", config.estimator.max_iter as u64),
        ("max_bins", config.binning.max_bins as u64),
        ("seed", config.seed),
    ])?;
    tracking.log_artifact(&model_path)?;
    save_artifact(
        &config.tracking_run_path(),
        &RunRef {
            run_id: tracking.run_id.clone(),
        },
    )?;
    print_info(&format!("Tracking run {}", tracking.run_id));

    let artifact = TrainerArtifact {
        trained_model_path: model_path,
    };
    artifact.verify_files("trainer")?;
    save_artifact(&config.trainer_artifact_path(), &artifact)?;

    print_step_time(start.elapsed());
    Ok(artifact)
}
