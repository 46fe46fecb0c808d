//! End-to-end tests for the full scorecard pipeline.

use riskcard::entity::artifacts::{load_artifact, PusherArtifact};
use riskcard::error::StageError;
use riskcard::pipeline;
use riskcard::pipeline::evaluation::MetricsReport;
use riskcard::pipeline::prediction::Predictor;
use riskcard::schema::CreditApplication;

#[path = "common/mod.rs"]
mod common;

use common::*;

fn sample_application() -> CreditApplication {
    CreditApplication {
        age: 32,
        income: 60_000.0,
        home_ownership: "RENT".to_string(),
        employment_length: 6.0,
        loan_intent: "EDUCATION".to_string(),
        loan_grade: "B".to_string(),
        loan_amount: 8_000.0,
        interest_rate: 11.0,
        loan_percent_income: 0.13,
        previous_default: "N".to_string(),
        credit_history_length: 9,
    }
}

#[test]
fn test_full_pipeline_produces_all_artifacts() {
    let (_workspace, config) = pipeline_workspace(240);

    pipeline::run_full_pipeline(&config).unwrap();

    // Every stage persisted its artifact record
    assert!(config.ingestion_artifact_path().exists());
    assert!(config.validation_artifact_path().exists());
    assert!(config.transformation_artifact_path().exists());
    assert!(config.trainer_artifact_path().exists());
    assert!(config.evaluation_artifact_path().exists());
    assert!(config.pusher_artifact_path().exists());

    // Metrics report is well-formed and in range
    let report: MetricsReport =
        load_artifact(&config.evaluation_dir().join("metrics.json")).unwrap();
    for fold in [&report.train, &report.test, &report.oot] {
        assert!(fold.auc > 0.0 && fold.auc <= 1.0);
        assert!(fold.gini >= -1.0 && fold.gini <= 1.0);
        assert!(fold.ks >= 0.0 && fold.ks <= 1.0);
        assert!(fold.brier >= 0.0 && fold.brier <= 1.0);
    }
    assert!(report.psi >= 0.0);

    // Training data carries a real signal
    assert!(report.train.auc > 0.55, "train AUC {}", report.train.auc);
}

#[test]
fn test_full_pipeline_deploys_servable_model() {
    let (_workspace, config) = pipeline_workspace(240);
    pipeline::run_full_pipeline(&config).unwrap();

    let pushed: PusherArtifact = load_artifact(&config.pusher_artifact_path()).unwrap();
    assert!(pushed.pushed_model_path.starts_with(&config.export_dir));

    let predictor = Predictor::from_artifact(&pushed).unwrap();
    let response = predictor.predict_application(&sample_application()).unwrap();

    assert!((1..=8).contains(&response.credit_level));
    assert!((0.0..=1.0).contains(&response.default_probability));
    assert!(!response.credit_description.is_empty());
    assert!(!response.risk_level.is_empty());
}

#[test]
fn test_tracking_run_captures_params_and_metrics() {
    let (_workspace, config) = pipeline_workspace(240);
    pipeline::run_full_pipeline(&config).unwrap();

    let run_ref: riskcard::tracking::RunRef =
        load_artifact(&config.tracking_run_path()).unwrap();
    let run_dir = config.tracking_dir.join(&run_ref.run_id);
    assert!(run_dir.join("params.json").exists());
    assert!(run_dir.join("metrics.json").exists());
    assert!(run_dir.join("artifacts/scorecard.json").exists());

    let metrics: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(run_dir.join("metrics.json")).unwrap())
            .unwrap();
    assert!(metrics.get("train_auc").is_some());
    assert!(metrics.get("psi").is_some());
}

#[test]
fn test_pipeline_stops_at_validation_gate() {
    let (_workspace, config) = pipeline_workspace(120);

    // Break the schema by dropping a declared column from the source
    let source = config.source_dir.join(&config.raw_file_name);
    let df = riskcard::utils::load_csv(&source).unwrap();
    let mut broken = df.drop("loan_grade").unwrap();
    riskcard::utils::save_csv(&mut broken, &source).unwrap();

    let err = pipeline::run_full_pipeline(&config).unwrap_err();
    let stage_err = err.downcast_ref::<StageError>().unwrap();
    assert!(matches!(stage_err, StageError::SchemaMismatch { .. }));

    // Nothing past validation was produced
    assert!(!config.transformation_artifact_path().exists());
    assert!(!config.trainer_artifact_path().exists());
}

#[test]
fn test_pipeline_is_reproducible_for_a_fixed_seed() {
    let (_w1, config1) = pipeline_workspace(200);
    let (_w2, config2) = pipeline_workspace(200);
    pipeline::run_full_pipeline(&config1).unwrap();
    pipeline::run_full_pipeline(&config2).unwrap();

    let report1: MetricsReport =
        load_artifact(&config1.evaluation_dir().join("metrics.json")).unwrap();
    let report2: MetricsReport =
        load_artifact(&config2.evaluation_dir().join("metrics.json")).unwrap();
    assert_eq!(report1.train.auc, report2.train.auc);
    assert_eq!(report1.oot.ks, report2.oot.ks);
    assert_eq!(report1.psi, report2.psi);
}
