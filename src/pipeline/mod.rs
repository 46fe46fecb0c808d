//! The batch pipeline: six stages from raw CSV to deployed scorecard.
//!
//! Stages communicate only through persisted artifacts, so each stage
//! can also be run in isolation from the CLI. The full run wires them
//! in order and stops at the validation gate if the dataset does not
//! match the declared schema.

pub mod evaluation;
pub mod ingestion;
pub mod prediction;
pub mod pusher;
pub mod trainer;
pub mod transformation;
pub mod validation;

use anyhow::Result;

use crate::entity::config::PipelineConfig;
use crate::error::StageError;
use crate::utils::{load_csv, print_completion, print_info, print_stage_header};

/// Run every stage in order, gating on validation, and finish with a
/// smoke prediction against the freshly deployed model.
pub fn run_full_pipeline(config: &PipelineConfig) -> Result<()> {
    config.validate()?;

    print_stage_header(1, "Data ingestion");
    let ingestion = ingestion::run(config)?;

    print_stage_header(2, "Data validation");
    let validation = validation::run(config, &ingestion)?;
    if !validation.validation_status {
        return Err(StageError::SchemaMismatch {
            report: validation.validation_report_file_path,
        }
        .into());
    }

    print_stage_header(3, "Data transformation");
    let transformation = transformation::run(config, &ingestion)?;

    print_stage_header(4, "Model training");
    let trainer = trainer::run(config, &transformation)?;

    print_stage_header(5, "Model evaluation");
    evaluation::run(config, &transformation, &trainer)?;

    print_stage_header(6, "Model deployment");
    let pushed = pusher::run(config, &trainer)?;

    smoke_predict(&pushed, &transformation)?;

    print_completion();
    Ok(())
}

/// Score one held-out row through the deployed model to prove the
/// serving path works end to end.
fn smoke_predict(
    pushed: &crate::entity::artifacts::PusherArtifact,
    transformation: &crate::entity::artifacts::TransformationArtifact,
) -> Result<()> {
    let predictor = prediction::Predictor::from_artifact(pushed)?;
    let x_test = load_csv(&transformation.x_test_path)?;
    let sample = x_test.head(Some(1));
    let responses = predictor.predict_frame(&sample)?;
    if let Some(response) = responses.first() {
        print_info(&format!(
            "Smoke prediction: score {} ({}), default probability {:.4} ({})",
            response.credit_score,
            response.credit_description,
            response.default_probability,
            response.risk_level
        ));
    }
    Ok(())
}
