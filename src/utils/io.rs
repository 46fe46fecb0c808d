//! Dataset I/O helpers for CSV-backed artifacts.

use anyhow::{Context, Result};
use polars::prelude::*;
use std::path::Path;

use crate::error::StageError;

/// Load a CSV file into an eager DataFrame.
pub fn load_csv(path: &Path) -> Result<DataFrame> {
    let lf = LazyCsvReader::new(path)
        .finish()
        .with_context(|| format!("Failed to load CSV file: {}", path.display()))?;
    lf.collect()
        .with_context(|| format!("Failed to collect CSV file: {}", path.display()))
}

/// Write a DataFrame as CSV, creating parent directories as needed.
pub fn save_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    CsvWriter::new(&mut file)
        .finish(df)
        .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
    Ok(())
}

/// Extract a binary 0/1 target column as `Vec<i32>`.
///
/// Handles integer and float storage uniformly; nulls or values other
/// than 0/1 are rejected.
pub fn extract_binary_target(df: &DataFrame, target: &str, stage: &'static str) -> Result<Vec<i32>> {
    let col = df.column(target).map_err(|_| StageError::MissingColumn {
        stage,
        column: target.to_string(),
    })?;

    let float_col = col.cast(&DataType::Float64)?;
    let values = float_col.f64()?;

    const TOLERANCE: f64 = 1e-9;
    let mut out = Vec::with_capacity(values.len());
    let mut bad: Vec<f64> = Vec::new();
    let mut has_null = false;
    for v in values.into_iter() {
        match v {
            Some(val) if (val - 0.0).abs() < TOLERANCE => out.push(0),
            Some(val) if (val - 1.0).abs() < TOLERANCE => out.push(1),
            Some(val) => {
                if !bad.contains(&val) {
                    bad.push(val);
                }
            }
            None => has_null = true,
        }
    }
    if has_null {
        bad.push(f64::NAN);
    }

    if !bad.is_empty() {
        return Err(StageError::NonBinaryTarget {
            column: target.to_string(),
            values: bad,
        }
        .into());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data/sample.csv");
        let mut df = df! {
            "a" => [1i64, 2, 3],
            "b" => ["x", "y", "z"],
        }
        .unwrap();
        save_csv(&mut df, &path).unwrap();
        let loaded = load_csv(&path).unwrap();
        assert_eq!(loaded.shape(), (3, 2));
    }

    #[test]
    fn test_extract_binary_target_int_and_float() {
        let df = df! {
            "t_int" => [0i64, 1, 0, 1],
            "t_float" => [0.0f64, 1.0, 1.0, 0.0],
        }
        .unwrap();
        assert_eq!(extract_binary_target(&df, "t_int", "test").unwrap(), vec![0, 1, 0, 1]);
        assert_eq!(extract_binary_target(&df, "t_float", "test").unwrap(), vec![0, 1, 1, 0]);
    }

    #[test]
    fn test_extract_binary_target_rejects_other_values() {
        let df = df! { "t" => [0i64, 1, 2] }.unwrap();
        assert!(extract_binary_target(&df, "t", "test").is_err());
    }

    #[test]
    fn test_extract_binary_target_rejects_missing_column() {
        let df = df! { "other" => [0i64, 1] }.unwrap();
        assert!(extract_binary_target(&df, "t", "test").is_err());
    }
}
