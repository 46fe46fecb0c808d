//! Model evaluation: discrimination and stability metrics per fold.
//!
//! The trained scorecard is scored against the train, test, and
//! out-of-time partitions; PSI compares the out-of-time probability
//! distribution against train. The report is persisted as JSON and
//! appended to the tracking run opened by the trainer.

use anyhow::{Context, Result};
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, Table};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::entity::artifacts::{
    load_artifact, save_artifact, ArtifactFiles, EvaluationArtifact, TrainerArtifact,
    TransformationArtifact,
};
use crate::entity::config::PipelineConfig;
use crate::metrics::{fold_metrics, population_stability_index, FoldMetrics};
use crate::model::Scorecard;
use crate::tracking::{RunRef, TrackingRun};
use crate::utils::{extract_binary_target, load_csv, print_step_time, print_success};

/// Full evaluation report persisted by this stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    pub train: FoldMetrics,
    pub test: FoldMetrics,
    pub oot: FoldMetrics,
    pub psi: f64,
}

pub fn run(
    config: &PipelineConfig,
    transformation: &TransformationArtifact,
    trainer: &TrainerArtifact,
) -> Result<EvaluationArtifact> {
    let start = Instant::now();
    transformation.verify_files("evaluation")?;
    trainer.verify_files("evaluation")?;

    let scorecard = Scorecard::load(&trainer.trained_model_path)?;

    let (train_proba, train) = score_fold(
        &scorecard,
        config,
        &transformation.x_train_path,
        &transformation.y_train_path,
    )?;
    let (_, test) = score_fold(
        &scorecard,
        config,
        &transformation.x_test_path,
        &transformation.y_test_path,
    )?;
    let (oot_proba, oot) = score_fold(
        &scorecard,
        config,
        &transformation.x_oot_path,
        &transformation.y_oot_path,
    )?;
    let psi = population_stability_index(&train_proba, &oot_proba);

    let report = MetricsReport {
        train,
        test,
        oot,
        psi,
    };
    print_metrics_table(&report);

    let metrics_path = config.evaluation_dir().join("metrics.json");
    save_artifact(&metrics_path, &report)?;

    let run_ref: RunRef = load_artifact(&config.tracking_run_path())
        .context("loading the tracking run reference written by the trainer")?;
    let tracking = TrackingRun::resume(&config.tracking_dir, &run_ref.run_id)?;
    tracking.log_metrics(flatten_metrics(&report))?;

    let artifact = EvaluationArtifact {
        evaluation_metrics_path: metrics_path,
    };
    artifact.verify_files("evaluation")?;
    save_artifact(&config.evaluation_artifact_path(), &artifact)?;

    print_success("Evaluation report persisted");
    print_step_time(start.elapsed());
    Ok(artifact)
}

fn score_fold(
    scorecard: &Scorecard,
    config: &PipelineConfig,
    x_path: &std::path::Path,
    y_path: &std::path::Path,
) -> Result<(Vec<f64>, FoldMetrics)> {
    let x: DataFrame = load_csv(x_path)?;
    let y_df = load_csv(y_path)?;
    let y = extract_binary_target(&y_df, &config.target_column, "evaluation")?;
    let proba = scorecard.predict_proba(&x)?;
    let metrics = fold_metrics(&proba, &y)?;
    Ok((proba, metrics))
}

fn flatten_metrics(report: &MetricsReport) -> Vec<(String, f64)> {
    let mut out = Vec::new();
    for (fold, metrics) in [
        ("train", &report.train),
        ("test", &report.test),
        ("oot", &report.oot),
    ] {
        out.push((format!("{}_auc", fold), metrics.auc));
        out.push((format!("{}_gini", fold), metrics.gini));
        out.push((format!("{}_pr_auc", fold), metrics.pr_auc));
        out.push((format!("{}_ks", fold), metrics.ks));
        out.push((format!("{}_brier", fold), metrics.brier));
    }
    out.push(("psi".to_string(), report.psi));
    out
}

fn print_metrics_table(report: &MetricsReport) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Fold", "AUC", "Gini", "PR-AUC", "KS", "Brier"]);
    for (fold, m) in [
        ("train", &report.train),
        ("test", &report.test),
        ("oot", &report.oot),
    ] {
        table.add_row(vec![
            Cell::new(fold),
            Cell::new(format!("{:.4}", m.auc)),
            Cell::new(format!("{:.4}", m.gini)),
            Cell::new(format!("{:.4}", m.pr_auc)),
            Cell::new(format!("{:.4}", m.ks)),
            Cell::new(format!("{:.4}", m.brier)),
        ]);
    }
    println!("{table}");
    println!("    PSI (train vs out-of-time): {:.4}", report.psi);
}
