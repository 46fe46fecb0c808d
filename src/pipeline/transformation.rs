//! Data transformation: outlier capping, stratified splitting, and
//! supervised binning.
//!
//! Numeric features are capped to their [p1, p99] range, the dataset
//! is split into train/test/out-of-time partitions stratified on the
//! target, and the binning process is fitted on the training partition
//! only. All six split frames plus the fitted binning are persisted
//! for the downstream stages.

use anyhow::{Context, Result};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::time::Instant;

use crate::entity::artifacts::{
    save_artifact, ArtifactFiles, IngestionArtifact, TransformationArtifact,
};
use crate::entity::config::PipelineConfig;
use crate::error::StageError;
use crate::metrics::percentile;
use crate::model::BinningProcess;
use crate::utils::{
    create_spinner, extract_binary_target, finish_with_success, load_csv, print_info,
    print_step_time, print_success, save_csv,
};

/// Lower/upper percentiles numeric features are capped to.
const CAP_PERCENTILES: (f64, f64) = (1.0, 99.0);

pub fn run(config: &PipelineConfig, ingestion: &IngestionArtifact) -> Result<TransformationArtifact> {
    let start = Instant::now();
    ingestion.verify_files("transformation")?;

    let raw = load_csv(&ingestion.data_csv_file_path)?;
    let capped = cap_outliers(&raw, &config.target_column)?;
    print_info(&format!(
        "Capped numeric features to their [p{}, p{}] range",
        CAP_PERCENTILES.0, CAP_PERCENTILES.1
    ));

    let stage_dir = config.transformation_dir();
    let transformed_path = stage_dir.join("transformed.csv");
    let mut transformed = capped.clone();
    save_csv(&mut transformed, &transformed_path)?;

    let y = extract_binary_target(&capped, &config.target_column, "transformation")?;
    let split = stratified_three_way(&y, config.test_size, config.oot_size, config.seed)?;
    print_info(&format!(
        "Split rows: {} train / {} test / {} out-of-time",
        split.train.len(),
        split.test.len(),
        split.oot.len()
    ));

    let (mut x_train, mut y_train) = partition(&capped, &split.train, &config.target_column)?;
    let (mut x_test, mut y_test) = partition(&capped, &split.test, &config.target_column)?;
    let (mut x_oot, mut y_oot) = partition(&capped, &split.oot, &config.target_column)?;

    let x_train_path = stage_dir.join("x_train.csv");
    let x_test_path = stage_dir.join("x_test.csv");
    let x_oot_path = stage_dir.join("x_oot.csv");
    let y_train_path = stage_dir.join("y_train.csv");
    let y_test_path = stage_dir.join("y_test.csv");
    let y_oot_path = stage_dir.join("y_oot.csv");
    save_csv(&mut x_train, &x_train_path)?;
    save_csv(&mut x_test, &x_test_path)?;
    save_csv(&mut x_oot, &x_oot_path)?;
    save_csv(&mut y_train, &y_train_path)?;
    save_csv(&mut y_test, &y_test_path)?;
    save_csv(&mut y_oot, &y_oot_path)?;

    let spinner = create_spinner("Fitting supervised binning on the training partition");
    let y_train_values = extract_binary_target(&y_train, &config.target_column, "transformation")?;
    let binning = BinningProcess::fit(
        &x_train,
        &y_train_values,
        config.binning,
        &config.target_column,
    )?;
    let binning_model_path = stage_dir.join("binning.json");
    binning.save(&binning_model_path)?;
    finish_with_success(&spinner, "Binning fitted and persisted");

    let artifact = TransformationArtifact {
        transformed_csv_file_path: transformed_path,
        binning_model_path,
        x_train_path,
        x_test_path,
        x_oot_path,
        y_train_path,
        y_test_path,
        y_oot_path,
    };
    artifact.verify_files("transformation")?;
    save_artifact(&config.transformation_artifact_path(), &artifact)?;

    print_success("Transformation artifacts ready");
    print_step_time(start.elapsed());
    Ok(artifact)
}

/// Cap every numeric non-target column to its [p1, p99] range.
///
/// Capped columns come back as Float64 regardless of input dtype; the
/// percentiles are computed over the full dataset before any split.
pub fn cap_outliers(df: &DataFrame, target: &str) -> Result<DataFrame> {
    let mut out = df.clone();
    for column in df.get_columns() {
        let name = column.name().clone();
        if name.as_str() == target || !column.dtype().is_primitive_numeric() {
            continue;
        }

        let float_col = column.cast(&DataType::Float64)?;
        let values = float_col.f64()?;
        let mut sorted: Vec<f64> = values.into_iter().flatten().collect();
        if sorted.is_empty() {
            continue;
        }
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let lower = percentile(&sorted, CAP_PERCENTILES.0);
        let upper = percentile(&sorted, CAP_PERCENTILES.1);

        let capped: Float64Chunked = values
            .into_iter()
            .map(|opt| opt.map(|v| v.clamp(lower, upper)))
            .collect();
        let mut series = capped.into_series();
        series.rename(name);
        out.with_column(series)?;
    }
    Ok(out)
}

/// Row index partitions of a stratified three-way split.
#[derive(Debug, Clone)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
    pub oot: Vec<usize>,
}

/// Stratified train/test/out-of-time split over target labels.
///
/// The out-of-time partition is carved off the full dataset first;
/// the test partition is then carved off the remainder. Both draws are
/// stratified per class, each class keeping at least one row on either
/// side of the cut.
pub fn stratified_three_way(
    y: &[i32],
    test_size: f64,
    oot_size: f64,
    seed: u64,
) -> Result<SplitIndices, StageError> {
    let mut rng = StdRng::seed_from_u64(seed);

    let (dev, oot) = stratified_holdout(y, oot_size, &mut rng)?;
    let y_dev: Vec<i32> = dev.iter().map(|&i| y[i]).collect();
    let (train_rel, test_rel) = stratified_holdout(&y_dev, test_size, &mut rng)?;

    let train: Vec<usize> = train_rel.into_iter().map(|i| dev[i]).collect();
    let test: Vec<usize> = test_rel.into_iter().map(|i| dev[i]).collect();
    Ok(SplitIndices { train, test, oot })
}

/// Hold out `fraction` of each class; returns (remainder, holdout)
/// index lists in ascending row order.
fn stratified_holdout(
    y: &[i32],
    fraction: f64,
    rng: &mut StdRng,
) -> Result<(Vec<usize>, Vec<usize>), StageError> {
    let mut by_class: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (idx, &label) in y.iter().enumerate() {
        by_class.entry(label).or_default().push(idx);
    }

    let mut remainder = Vec::new();
    let mut holdout = Vec::new();
    for (label, mut indices) in by_class {
        if indices.len() < 2 {
            return Err(StageError::DegenerateStratification {
                class: label as i64,
                count: indices.len(),
            });
        }
        indices.shuffle(rng);
        let n_hold = ((indices.len() as f64 * fraction).round() as usize)
            .clamp(1, indices.len() - 1);
        holdout.extend_from_slice(&indices[..n_hold]);
        remainder.extend_from_slice(&indices[n_hold..]);
    }
    remainder.sort_unstable();
    holdout.sort_unstable();
    Ok((remainder, holdout))
}

/// Take the given rows and separate features from the target column.
fn partition(df: &DataFrame, rows: &[usize], target: &str) -> Result<(DataFrame, DataFrame)> {
    let idx = IdxCa::from_vec("idx".into(), rows.iter().map(|&i| i as IdxSize).collect());
    let subset = df.take(&idx).context("taking split rows")?;
    let x = subset.drop(target)?;
    let y = subset.select([target])?;
    Ok((x, y))
}
