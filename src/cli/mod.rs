//! CLI entry points: parse arguments and dispatch to pipeline stages.

pub mod args;

use anyhow::{Context, Result};
use clap::Parser;

use crate::entity::artifacts::{
    load_artifact, IngestionArtifact, PusherArtifact, TrainerArtifact, TransformationArtifact,
};
use crate::entity::config::PipelineConfig;
use crate::pipeline;
use crate::pipeline::prediction::Predictor;
use crate::schema::CreditApplication;
use crate::utils::print_banner;

use args::{Cli, Commands, PredictArgs};

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => {
            print_banner(env!("CARGO_PKG_VERSION"));
            pipeline::run_full_pipeline(&args.to_config())
        }
        Commands::Ingest(args) => {
            let config = validated(args.to_config())?;
            pipeline::ingestion::run(&config).map(|_| ())
        }
        Commands::Validate(args) => {
            let config = validated(args.to_config())?;
            let ingestion: IngestionArtifact = load_artifact(&config.ingestion_artifact_path())
                .context("run the ingest stage first")?;
            pipeline::validation::run(&config, &ingestion).map(|_| ())
        }
        Commands::Transform(args) => {
            let config = validated(args.to_config())?;
            let ingestion: IngestionArtifact = load_artifact(&config.ingestion_artifact_path())
                .context("run the ingest stage first")?;
            pipeline::transformation::run(&config, &ingestion).map(|_| ())
        }
        Commands::Train(args) => {
            let config = validated(args.to_config())?;
            let transformation: TransformationArtifact =
                load_artifact(&config.transformation_artifact_path())
                    .context("run the transform stage first")?;
            pipeline::trainer::run(&config, &transformation).map(|_| ())
        }
        Commands::Evaluate(args) => {
            let config = validated(args.to_config())?;
            let transformation: TransformationArtifact =
                load_artifact(&config.transformation_artifact_path())
                    .context("run the transform stage first")?;
            let trainer: TrainerArtifact = load_artifact(&config.trainer_artifact_path())
                .context("run the train stage first")?;
            pipeline::evaluation::run(&config, &transformation, &trainer).map(|_| ())
        }
        Commands::Push(args) => {
            let config = validated(args.to_config())?;
            let trainer: TrainerArtifact = load_artifact(&config.trainer_artifact_path())
                .context("run the train stage first")?;
            pipeline::pusher::run(&config, &trainer).map(|_| ())
        }
        Commands::Predict(args) => predict(args),
    }
}

fn validated(config: PipelineConfig) -> Result<PipelineConfig> {
    config.validate()?;
    Ok(config)
}

fn predict(args: PredictArgs) -> Result<()> {
    let predictor = match &args.model {
        Some(path) => Predictor::from_model_path(path)?,
        None => {
            let config = PipelineConfig::with_root(&args.workspace, args.workspace.clone());
            let pushed: PusherArtifact = load_artifact(&config.pusher_artifact_path())
                .context("no deployed model found; run the push stage first")?;
            Predictor::from_artifact(&pushed)?
        }
    };

    let json = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read applicant record {}", args.input.display()))?;
    let application: CreditApplication = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse applicant record {}", args.input.display()))?;

    let response = predictor.predict_application(&application)?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
