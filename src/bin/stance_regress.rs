//! stance-regress: train or load the regression predictor and score a split.

use std::path::PathBuf;

use clap::Parser;
use stancelab::corpus::load_documents;
use stancelab::predictor::regression::STRATEGY_NAME;
use stancelab::predictor::writer::write_run;
use stancelab::{Config, PredictionRun, StanceError, StanceRegressor};
use tracing::info;

/// Regression stance predictor
#[derive(Parser)]
#[command(name = "stance-regress")]
#[command(version)]
#[command(about = "Train the regression stance predictor and predict an evaluation split")]
struct Args {
    /// Evaluation split (JSON array of {id?, title, abstract, stance})
    #[arg(short, long)]
    input: PathBuf,

    /// Prediction file to write
    #[arg(short, long)]
    output: PathBuf,

    /// Training split; required unless a saved model is loaded
    #[arg(short, long)]
    train: Option<PathBuf>,

    /// Model file, loaded when present and saved after training
    #[arg(short, long, env = "STANCELAB_REGRESSION_MODEL")]
    model: Option<PathBuf>,

    /// Train even if the model file exists
    #[arg(long)]
    retrain: bool,

    /// Config file (default: ./stancelab.toml, then ~/.stancelab/config.toml)
    #[arg(short, long, env = "STANCELAB_CONFIG")]
    config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: info; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;
    let documents = load_documents(&args.input)?;

    let saved = args
        .model
        .as_ref()
        .filter(|path| path.exists() && !args.retrain);

    let model = match saved {
        Some(path) => {
            info!(path = %path.display(), "loading saved model");
            StanceRegressor::load(path)?
        }
        None => {
            let train_path = args.train.as_ref().ok_or_else(|| {
                StanceError::Configuration(
                    "--train is required when no saved model is available".into(),
                )
            })?;
            let training = load_documents(train_path)?;
            let (model, report) = StanceRegressor::train(&training, &config.training)?;
            if let Some(mae) = report.validation_mae {
                println!("validation MAE: {mae:.4} ({} documents)", report.validation_size);
            }
            if let Some(path) = &args.model {
                model.save(path)?;
                info!(path = %path.display(), "saved model");
            }
            model
        }
    };

    let run = PredictionRun {
        strategy: STRATEGY_NAME.to_string(),
        predictions: model.predict_all(&documents),
        failures: Vec::new(),
    };
    write_run(&args.output, &run)?;

    println!(
        "{} predictions written to {}",
        run.predictions.len(),
        args.output.display()
    );
    Ok(())
}
