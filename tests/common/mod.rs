//! Shared test utilities and fixture generators

use polars::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

use riskcard::entity::config::PipelineConfig;

/// Deterministic pseudo-uniform value in [0, 1) keyed on a row index.
fn noise(i: usize) -> f64 {
    ((i.wrapping_mul(2_654_435_761)) % 1000) as f64 / 1000.0
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Build a synthetic credit dataset with a real signal in it.
///
/// Default probability rises with the interest rate, the loan burden,
/// a prior default, and a worse loan grade, so a fitted scorecard
/// should comfortably beat random on this data.
pub fn synthetic_credit_frame(rows: usize) -> DataFrame {
    let home_options = ["RENT", "OWN", "MORTGAGE"];
    let intent_options = ["EDUCATION", "MEDICAL", "VENTURE", "PERSONAL"];
    let grade_options = ["A", "B", "C", "D"];

    let mut age = Vec::with_capacity(rows);
    let mut income = Vec::with_capacity(rows);
    let mut home = Vec::with_capacity(rows);
    let mut employment = Vec::with_capacity(rows);
    let mut intent = Vec::with_capacity(rows);
    let mut grade = Vec::with_capacity(rows);
    let mut amount = Vec::with_capacity(rows);
    let mut rate = Vec::with_capacity(rows);
    let mut burden = Vec::with_capacity(rows);
    let mut prev_default = Vec::with_capacity(rows);
    let mut history = Vec::with_capacity(rows);
    let mut defaulted = Vec::with_capacity(rows);

    for i in 0..rows {
        let person_age = 21 + ((i * 7) % 40) as i64;
        let person_income = 20_000.0 + ((i * 131) % 100) as f64 * 1_000.0;
        let loan_amount = 3_000.0 + ((i * 17) % 20) as f64 * 500.0;
        let interest_rate = 6.0 + ((i * 13) % 12) as f64;
        let loan_burden = loan_amount / person_income;
        let grade_label = grade_options[i % grade_options.len()];
        let had_default = (i * 11) % 10 < 2;

        let grade_effect = match grade_label {
            "A" => -0.5,
            "B" => 0.0,
            "C" => 0.4,
            _ => 0.8,
        };
        let logit = -2.2
            + 0.25 * (interest_rate - 12.0)
            + 3.0 * loan_burden
            + if had_default { 1.2 } else { 0.0 }
            + grade_effect;
        let label = if sigmoid(logit) > noise(i) { 1i64 } else { 0i64 };

        age.push(person_age);
        income.push(person_income);
        home.push(home_options[i % home_options.len()]);
        employment.push(((i * 3) % 15) as f64);
        intent.push(intent_options[i % intent_options.len()]);
        grade.push(grade_label);
        amount.push(loan_amount);
        rate.push(interest_rate);
        burden.push(loan_burden);
        prev_default.push(if had_default { "Y" } else { "N" });
        history.push(2 + ((i * 5) % 25) as i64);
        defaulted.push(label);
    }

    df! {
        "age" => age,
        "income" => income,
        "home_ownership" => home,
        "employment_length" => employment,
        "loan_intent" => intent,
        "loan_grade" => grade,
        "loan_amount" => amount,
        "interest_rate" => rate,
        "loan_percent_income" => burden,
        "previous_default" => prev_default,
        "credit_history_length" => history,
        "defaulted" => defaulted,
    }
    .unwrap()
}

/// Write a DataFrame as a CSV inside a fresh temporary directory.
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("credit_risk.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// A workspace with the synthetic dataset staged as the raw source
/// file, plus a matching pipeline configuration.
pub fn pipeline_workspace(rows: usize) -> (TempDir, PipelineConfig) {
    let temp_dir = TempDir::new().unwrap();
    let source_dir = temp_dir.path().join("data");
    std::fs::create_dir_all(&source_dir).unwrap();

    let mut df = synthetic_credit_frame(rows);
    let csv_path = source_dir.join("credit_risk.csv");
    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(&mut df).unwrap();

    let config = PipelineConfig::with_root(temp_dir.path(), source_dir);
    (temp_dir, config)
}
