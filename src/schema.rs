//! Dataset schema declaration and the applicant record.
//!
//! The raw dataset carries eleven applicant features of mixed
//! numeric/categorical type plus the binary target `defaulted`.
//! Validation compares actual CSV dtypes against the coarse type tags
//! declared here; serving deserializes single applicant records into
//! [`CreditApplication`].

use anyhow::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::StageError;

/// Name of the binary target column in the raw dataset.
pub const TARGET_COLUMN: &str = "defaulted";

/// Coarse column type tags used by schema validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Int,
    Float,
    Object,
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnKind::Int => write!(f, "int"),
            ColumnKind::Float => write!(f, "float"),
            ColumnKind::Object => write!(f, "object"),
        }
    }
}

impl ColumnKind {
    /// Whether a polars dtype satisfies this coarse tag.
    pub fn matches(&self, dtype: &DataType) -> bool {
        match self {
            ColumnKind::Int => dtype.is_integer(),
            ColumnKind::Float => dtype.is_float(),
            ColumnKind::Object => matches!(dtype, DataType::String | DataType::Categorical(_, _)),
        }
    }
}

/// Declared schema for the credit dataset: 11 feature columns plus the
/// binary target, in stable order.
pub fn credit_schema() -> Vec<(&'static str, ColumnKind)> {
    vec![
        ("age", ColumnKind::Int),
        ("income", ColumnKind::Float),
        ("home_ownership", ColumnKind::Object),
        ("employment_length", ColumnKind::Float),
        ("loan_intent", ColumnKind::Object),
        ("loan_grade", ColumnKind::Object),
        ("loan_amount", ColumnKind::Float),
        ("interest_rate", ColumnKind::Float),
        ("loan_percent_income", ColumnKind::Float),
        ("previous_default", ColumnKind::Object),
        ("credit_history_length", ColumnKind::Int),
        (TARGET_COLUMN, ColumnKind::Int),
    ]
}

/// Feature column names (schema minus the target), in declaration order.
pub fn feature_columns() -> Vec<&'static str> {
    credit_schema()
        .into_iter()
        .map(|(name, _)| name)
        .filter(|name| *name != TARGET_COLUMN)
        .collect()
}

/// A single applicant record as accepted by the serving path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditApplication {
    pub age: i64,
    pub income: f64,
    pub home_ownership: String,
    pub employment_length: f64,
    pub loan_intent: String,
    pub loan_grade: String,
    pub loan_amount: f64,
    pub interest_rate: f64,
    pub loan_percent_income: f64,
    pub previous_default: String,
    pub credit_history_length: i64,
}

impl CreditApplication {
    /// Build a one-row DataFrame matching the training column layout.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let df = df! {
            "age" => [self.age],
            "income" => [self.income],
            "home_ownership" => [self.home_ownership.as_str()],
            "employment_length" => [self.employment_length],
            "loan_intent" => [self.loan_intent.as_str()],
            "loan_grade" => [self.loan_grade.as_str()],
            "loan_amount" => [self.loan_amount],
            "interest_rate" => [self.interest_rate],
            "loan_percent_income" => [self.loan_percent_income],
            "previous_default" => [self.previous_default.as_str()],
            "credit_history_length" => [self.credit_history_length],
        }?;
        Ok(df)
    }
}

/// Bucket a default probability into one of five ordinal risk bands.
///
/// Inputs outside [0, 1] (or non-finite) are a validation error, never
/// silently clamped.
pub fn risk_level(default_probability: f64) -> Result<&'static str, StageError> {
    if !default_probability.is_finite() || !(0.0..=1.0).contains(&default_probability) {
        return Err(StageError::InvalidProbability {
            value: default_probability,
        });
    }

    let level = if default_probability < 0.1 {
        "Very Low"
    } else if default_probability < 0.3 {
        "Low"
    } else if default_probability < 0.5 {
        "Medium"
    } else if default_probability < 0.7 {
        "High"
    } else {
        "Very High"
    };
    Ok(level)
}
