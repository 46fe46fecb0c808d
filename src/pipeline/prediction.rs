//! Online prediction against the deployed scorecard.
//!
//! The predictor loads the pushed model once and serves applicant
//! records: points score, credit level on an eight-band ladder, the
//! default probability, and a five-band ordinal risk level.

use anyhow::Result;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::entity::artifacts::PusherArtifact;
use crate::error::StageError;
use crate::model::Scorecard;
use crate::schema::{risk_level, CreditApplication};

/// Credit level bands over the points score. Upper bounds are
/// inclusive; the final band is open-ended.
const CREDIT_LEVELS: [(f64, u8, &str); 7] = [
    (380.0, 1, "Very Poor"),
    (450.0, 2, "Poor"),
    (520.0, 3, "Average"),
    (590.0, 4, "Above Average"),
    (660.0, 5, "Good"),
    (730.0, 6, "Very Good"),
    (800.0, 7, "Excellent"),
];

const TOP_CREDIT_LEVEL: (u8, &str) = (8, "Exceptional");

/// Credit level and its human-readable description for a points score.
pub fn credit_level(score: f64) -> (u8, &'static str) {
    for (upper, level, description) in CREDIT_LEVELS {
        if score <= upper {
            return (level, description);
        }
    }
    TOP_CREDIT_LEVEL
}

/// One serving response per scored applicant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub credit_score: i64,
    pub credit_level: u8,
    pub credit_description: String,
    pub default_probability: f64,
    pub risk_level: String,
}

/// Serving-side wrapper around the deployed scorecard.
#[derive(Debug, Clone)]
pub struct Predictor {
    scorecard: Scorecard,
}

impl Predictor {
    /// Load the deployed model referenced by the pusher artifact.
    ///
    /// Any load failure surfaces as [`StageError::ModelUnavailable`] so
    /// callers can distinguish "no deployed model" from a bad request.
    pub fn from_artifact(artifact: &PusherArtifact) -> Result<Self, StageError> {
        Self::from_model_path(&artifact.pushed_model_path)
    }

    pub fn from_model_path(path: &Path) -> Result<Self, StageError> {
        let scorecard = Scorecard::load(path).map_err(|e| StageError::ModelUnavailable {
            path: path.to_path_buf(),
            reason: format!("{e:#}"),
        })?;
        Ok(Self { scorecard })
    }

    /// Score a batch of applicant rows.
    pub fn predict_frame(&self, df: &DataFrame) -> Result<Vec<PredictionResponse>> {
        let scores = self.scorecard.score(df)?;
        let probas = self.scorecard.predict_proba(df)?;

        let mut responses = Vec::with_capacity(scores.len());
        for (score, proba) in scores.into_iter().zip(probas) {
            responses.push(build_response(score, proba)?);
        }
        Ok(responses)
    }

    /// Score a single applicant record.
    pub fn predict_application(&self, application: &CreditApplication) -> Result<PredictionResponse> {
        let df = application.to_dataframe()?;
        let mut responses = self.predict_frame(&df)?;
        Ok(responses.remove(0))
    }
}

fn build_response(score: f64, proba: f64) -> Result<PredictionResponse, StageError> {
    let credit_score = score.round() as i64;
    let (level, description) = credit_level(credit_score as f64);
    let default_probability = (proba * 10_000.0).round() / 10_000.0;
    let risk = risk_level(default_probability)?;
    Ok(PredictionResponse {
        credit_score,
        credit_level: level,
        credit_description: description.to_string(),
        default_probability,
        risk_level: risk.to_string(),
    })
}
