//! Fitted model objects: supervised WoE binning, the logistic
//! estimator, and the points-based scorecard that combines them.

pub mod binning;
pub mod logistic;
pub mod scorecard;

pub use binning::{BinningProcess, BinningSettings};
pub use logistic::{LogisticParams, LogisticRegression};
pub use scorecard::{ScalingParams, Scorecard};
