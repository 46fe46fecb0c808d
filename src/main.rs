//! Riskcard: Credit Scorecard Pipeline CLI
//!
//! A command-line tool for building, evaluating, and serving
//! points-based credit risk scorecards.

use anyhow::Result;

fn main() -> Result<()> {
    riskcard::cli::run()
}
