//! The points-based scorecard: fitted binning + logistic classifier +
//! a linear transform from log-odds to an interpretable score.
//!
//! Scaling follows the points-to-double-odds convention:
//! `factor = pdo / ln 2`, `offset = target_score - factor * ln(target_odds)`,
//! and `score = offset - factor * log_odds(default)`, so a higher
//! probability of default always yields a lower score.

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::error::StageError;
use crate::model::binning::BinningProcess;
use crate::model::logistic::{LogisticParams, LogisticRegression};

/// Score scaling parameters, validated as present and sane before any
/// fit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScalingParams {
    /// Score assigned at `target_odds`
    pub target_score: f64,
    /// Good:bad odds at which `target_score` is anchored
    pub target_odds: f64,
    /// Points to double the odds
    pub pdo: f64,
}

impl Default for ScalingParams {
    fn default() -> Self {
        Self {
            target_score: 600.0,
            target_odds: 50.0,
            pdo: 20.0,
        }
    }
}

impl ScalingParams {
    pub fn validate(&self) -> Result<(), StageError> {
        if !(self.pdo > 0.0) {
            return Err(StageError::InvalidConfig {
                message: format!("pdo must be positive, got {}", self.pdo),
            });
        }
        if !(self.target_odds > 0.0) {
            return Err(StageError::InvalidConfig {
                message: format!("target_odds must be positive, got {}", self.target_odds),
            });
        }
        if !self.target_score.is_finite() {
            return Err(StageError::InvalidConfig {
                message: format!("target_score must be finite, got {}", self.target_score),
            });
        }
        Ok(())
    }

    fn factor(&self) -> f64 {
        self.pdo / std::f64::consts::LN_2
    }

    fn offset(&self) -> f64 {
        self.target_score - self.factor() * self.target_odds.ln()
    }
}

/// A fitted scorecard model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scorecard {
    pub binning: BinningProcess,
    pub estimator: LogisticRegression,
    pub scaling: ScalingParams,
}

impl Scorecard {
    /// Fit the logistic classifier over bin-transformed features.
    ///
    /// The binning process is a frozen encoding step, never refit here.
    pub fn fit(
        x_train: &DataFrame,
        y_train: &[i32],
        binning: BinningProcess,
        estimator_params: &LogisticParams,
        scaling: ScalingParams,
    ) -> Result<Self> {
        estimator_params.validate()?;
        scaling.validate()?;

        let design = binning
            .transform(x_train)
            .context("encoding training features through the fitted binning")?;
        let estimator = LogisticRegression::fit(&design, y_train, estimator_params)
            .context("fitting the logistic estimator")?;

        Ok(Self {
            binning,
            estimator,
            scaling,
        })
    }

    /// Probability of default (class 1) per input row.
    pub fn predict_proba(&self, df: &DataFrame) -> Result<Vec<f64>> {
        self.check_columns(df)?;
        let design = self.binning.transform(df)?;
        Ok(self.estimator.predict_proba(&design))
    }

    /// Points score per input row (unrounded).
    pub fn score(&self, df: &DataFrame) -> Result<Vec<f64>> {
        self.check_columns(df)?;
        let design = self.binning.transform(df)?;
        let factor = self.scaling.factor();
        let offset = self.scaling.offset();
        Ok(self
            .estimator
            .decision_function(&design)
            .into_iter()
            .map(|log_odds| offset - factor * log_odds)
            .collect())
    }

    /// The serving-time column set must equal the training feature set.
    fn check_columns(&self, df: &DataFrame) -> Result<(), StageError> {
        let expected: BTreeSet<&str> = self.binning.feature_names().into_iter().collect();
        let actual: BTreeSet<&str> = df
            .get_column_names()
            .iter()
            .map(|s| s.as_str())
            .collect();

        if expected == actual {
            return Ok(());
        }
        let missing = expected
            .difference(&actual)
            .map(|s| s.to_string())
            .collect();
        let unexpected = actual
            .difference(&expected)
            .map(|s| s.to_string())
            .collect();
        Err(StageError::ColumnSetMismatch { missing, unexpected })
    }

    /// Persist the fitted scorecard as a JSON document.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize scorecard to JSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write scorecard to {}", path.display()))?;
        Ok(())
    }

    /// Load a fitted scorecard from its JSON document.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scorecard from {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse scorecard at {}", path.display()))
    }
}
