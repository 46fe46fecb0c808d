//! Data validation: check the ingested CSV against the declared schema.
//!
//! Every declared column must be present with a dtype matching its
//! coarse tag (int/float/object). Extra columns are reported but do
//! not fail validation. The findings are written to a plain-text
//! report whether validation passes or not.

use anyhow::{Context, Result};
use polars::prelude::*;
use std::time::Instant;

use crate::entity::artifacts::{save_artifact, ArtifactFiles, IngestionArtifact, ValidationArtifact};
use crate::entity::config::PipelineConfig;
use crate::schema::credit_schema;
use crate::utils::{load_csv, print_info, print_step_time, print_success, print_warning};

pub fn run(config: &PipelineConfig, ingestion: &IngestionArtifact) -> Result<ValidationArtifact> {
    let start = Instant::now();
    ingestion.verify_files("validation")?;

    let df = load_csv(&ingestion.data_csv_file_path)?;
    let report = check_schema(&df);

    let report_path = config.validation_dir().join("report.txt");
    if let Some(parent) = report_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    std::fs::write(&report_path, report.render())
        .with_context(|| format!("Failed to write validation report to {}", report_path.display()))?;

    if report.status() {
        print_success(&format!(
            "Schema validated: {} columns, {} rows",
            df.width(),
            df.height()
        ));
    } else {
        print_warning("Schema validation failed");
    }
    for extra in &report.extra_columns {
        print_info(&format!("Ignoring undeclared column '{}'", extra));
    }

    let artifact = ValidationArtifact {
        validation_status: report.status(),
        validation_report_file_path: report_path,
    };
    save_artifact(&config.validation_artifact_path(), &artifact)?;

    print_step_time(start.elapsed());
    Ok(artifact)
}

/// Findings from comparing a DataFrame against the declared schema.
#[derive(Debug, Default)]
pub struct SchemaReport {
    pub missing_columns: Vec<String>,
    pub type_mismatches: Vec<(String, String, String)>,
    pub extra_columns: Vec<String>,
    pub checked: usize,
}

impl SchemaReport {
    pub fn status(&self) -> bool {
        self.missing_columns.is_empty() && self.type_mismatches.is_empty()
    }

    fn render(&self) -> String {
        let mut lines = vec![format!(
            "validation status: {}",
            if self.status() { "PASSED" } else { "FAILED" }
        )];
        lines.push(format!("columns checked: {}", self.checked));
        for col in &self.missing_columns {
            lines.push(format!("missing column: {}", col));
        }
        for (col, expected, actual) in &self.type_mismatches {
            lines.push(format!(
                "type mismatch: {} expected {} got {}",
                col, expected, actual
            ));
        }
        for col in &self.extra_columns {
            lines.push(format!("extra column (ignored): {}", col));
        }
        lines.join("\n") + "\n"
    }
}

/// Compare a DataFrame against the declared credit schema.
pub fn check_schema(df: &DataFrame) -> SchemaReport {
    let declared = credit_schema();
    let mut report = SchemaReport {
        checked: declared.len(),
        ..Default::default()
    };

    for (name, kind) in &declared {
        match df.column(name) {
            Ok(col) => {
                let dtype = col.dtype();
                if !kind.matches(dtype) {
                    report.type_mismatches.push((
                        name.to_string(),
                        kind.to_string(),
                        format!("{}", dtype),
                    ));
                }
            }
            Err(_) => report.missing_columns.push(name.to_string()),
        }
    }

    for col in df.get_column_names() {
        if !declared.iter().any(|(name, _)| name == &col.as_str()) {
            report.extra_columns.push(col.to_string());
        }
    }
    report
}
