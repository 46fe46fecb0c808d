//! Riskcard: Credit Scorecard Pipeline Library
//!
//! A library for building points-based credit risk scorecards:
//! ingestion, schema validation, outlier capping and stratified
//! splitting, supervised WoE binning, logistic scorecard training,
//! discrimination/stability evaluation, deployment and scoring.

pub mod cli;
pub mod entity;
pub mod error;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod schema;
pub mod tracking;
pub mod utils;
