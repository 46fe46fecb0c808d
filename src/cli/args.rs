//! Command-line argument definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::entity::config::{PipelineConfig, DEFAULT_RAW_FILE};

#[derive(Parser)]
#[command(name = "riskcard")]
#[command(about = "Credit scorecard batch pipeline and serving CLI")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline: ingest through deploy
    Run(PipelineArgs),

    /// Acquire the raw dataset into the artifact store
    Ingest(PipelineArgs),

    /// Validate the ingested dataset against the declared schema
    Validate(PipelineArgs),

    /// Cap outliers, split the data, and fit the binning
    Transform(PipelineArgs),

    /// Fit the logistic scorecard on the training partition
    Train(PipelineArgs),

    /// Compute discrimination and stability metrics per fold
    Evaluate(PipelineArgs),

    /// Deploy the trained model to the export directory
    Push(PipelineArgs),

    /// Score an applicant record against the deployed model
    Predict(PredictArgs),
}

#[derive(Args, Clone)]
pub struct PipelineArgs {
    /// Workspace root for artifacts, export, and tracking runs
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Directory the raw dataset is read from
    #[arg(long, default_value = "data")]
    pub source_dir: PathBuf,

    /// Raw dataset filename inside the source directory
    #[arg(long, default_value = DEFAULT_RAW_FILE)]
    pub raw_file: String,

    /// Fraction of the development set held out as test
    #[arg(long, default_value_t = 0.2)]
    pub test_size: f64,

    /// Fraction of the full dataset held out as out-of-time
    #[arg(long, default_value_t = 0.2)]
    pub oot_size: f64,

    /// Seed for the stratified shuffles
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Maximum bins per numeric feature
    #[arg(long, default_value_t = 5)]
    pub max_bins: usize,

    /// Score anchored at the target odds
    #[arg(long, default_value_t = 600.0)]
    pub target_score: f64,

    /// Good:bad odds at the anchor score
    #[arg(long, default_value_t = 50.0)]
    pub target_odds: f64,

    /// Points to double the odds
    #[arg(long, default_value_t = 20.0)]
    pub pdo: f64,

    /// Experiment run name prefix
    #[arg(long, default_value = "scorecard")]
    pub run_name: String,
}

impl PipelineArgs {
    /// Materialize the stage configuration from the parsed arguments.
    pub fn to_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::with_root(&self.workspace, self.source_dir.clone());
        config.raw_file_name = self.raw_file.clone();
        config.test_size = self.test_size;
        config.oot_size = self.oot_size;
        config.seed = self.seed;
        config.binning.max_bins = self.max_bins;
        config.scaling.target_score = self.target_score;
        config.scaling.target_odds = self.target_odds;
        config.scaling.pdo = self.pdo;
        config.run_name = self.run_name.clone();
        config
    }
}

#[derive(Args, Clone)]
pub struct PredictArgs {
    /// Workspace root the model was deployed under
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// JSON file holding one applicant record
    #[arg(long)]
    pub input: PathBuf,

    /// Explicit model path, overriding the deployed model lookup
    #[arg(long)]
    pub model: Option<PathBuf>,
}
