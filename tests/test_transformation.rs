//! Integration tests for the transformation stage.

use polars::prelude::*;

use riskcard::model::BinningProcess;
use riskcard::pipeline::{ingestion, transformation};
use riskcard::utils::{extract_binary_target, load_csv};

#[path = "common/mod.rs"]
mod common;

use common::*;

#[test]
fn test_transformation_writes_consistent_splits() {
    let (_workspace, config) = pipeline_workspace(250);
    let ingested = ingestion::run(&config).unwrap();
    let artifact = transformation::run(&config, &ingested).unwrap();

    let x_train = load_csv(&artifact.x_train_path).unwrap();
    let x_test = load_csv(&artifact.x_test_path).unwrap();
    let x_oot = load_csv(&artifact.x_oot_path).unwrap();
    let y_train = load_csv(&artifact.y_train_path).unwrap();
    let y_test = load_csv(&artifact.y_test_path).unwrap();
    let y_oot = load_csv(&artifact.y_oot_path).unwrap();

    // Feature/target row counts line up per split and cover the dataset
    assert_eq!(x_train.height(), y_train.height());
    assert_eq!(x_test.height(), y_test.height());
    assert_eq!(x_oot.height(), y_oot.height());
    assert_eq!(x_train.height() + x_test.height() + x_oot.height(), 250);

    // Feature frames hold 11 columns, target frames exactly one
    assert_eq!(x_train.width(), 11);
    assert!(!x_train
        .get_column_names()
        .iter()
        .any(|c| c.as_str() == config.target_column));
    assert_eq!(y_train.width(), 1);

    // Every split keeps both classes
    for y_df in [&y_train, &y_test, &y_oot] {
        let y = extract_binary_target(y_df, &config.target_column, "test").unwrap();
        assert!(y.contains(&0));
        assert!(y.contains(&1));
    }
}

#[test]
fn test_transformation_caps_numeric_features() {
    let (_workspace, config) = pipeline_workspace(250);
    let ingested = ingestion::run(&config).unwrap();
    let artifact = transformation::run(&config, &ingested).unwrap();

    let raw = load_csv(&ingested.data_csv_file_path).unwrap();
    let capped = load_csv(&artifact.transformed_csv_file_path).unwrap();
    assert_eq!(raw.height(), capped.height());

    // Capped numeric columns never exceed the raw extremes
    for name in ["income", "loan_amount", "interest_rate"] {
        let raw_col = raw.column(name).unwrap().cast(&DataType::Float64).unwrap();
        let capped_col = capped.column(name).unwrap().f64().unwrap().clone();
        let raw_f = raw_col.f64().unwrap();
        assert!(capped_col.min().unwrap() >= raw_f.min().unwrap());
        assert!(capped_col.max().unwrap() <= raw_f.max().unwrap());
    }
}

#[test]
fn test_fitted_binning_encodes_every_split() {
    let (_workspace, config) = pipeline_workspace(250);
    let ingested = ingestion::run(&config).unwrap();
    let artifact = transformation::run(&config, &ingested).unwrap();

    let binning = BinningProcess::load(&artifact.binning_model_path).unwrap();
    assert_eq!(binning.feature_names().len(), 11);

    for path in [
        &artifact.x_train_path,
        &artifact.x_test_path,
        &artifact.x_oot_path,
    ] {
        let x = load_csv(path).unwrap();
        let design = binning.transform(&x).unwrap();
        assert_eq!(design.nrows(), x.height());
        assert_eq!(design.ncols(), 11);
        assert!(design.iter().all(|v| v.is_finite()));
    }

    // IV is non-negative for every feature
    for (name, iv) in binning.information_values() {
        assert!(iv >= 0.0, "feature {} has negative IV {}", name, iv);
    }
}
