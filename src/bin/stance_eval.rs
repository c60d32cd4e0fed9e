//! stance-eval: evaluate prediction files against gold labels.

use std::path::PathBuf;

use clap::Parser;
use stancelab::corpus::load_documents;
use stancelab::{Config, Evaluator, PredictionSet};

/// Stance evaluation
#[derive(Parser)]
#[command(name = "stance-eval")]
#[command(version)]
#[command(about = "Evaluate every strategy's predictions against gold stance labels")]
struct Args {
    /// Gold split (JSON array of {id?, title, abstract, stance})
    #[arg(short, long)]
    gold: PathBuf,

    /// Directory of prediction files, one per strategy (<strategy>.json)
    #[arg(short, long)]
    predictions: PathBuf,

    /// Directory for evaluation_results.txt, summary.json and merged.json
    #[arg(short, long)]
    output: PathBuf,

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

    let gold = load_documents(&args.gold)?;
    let sets = PredictionSet::load_dir(&args.predictions)?;
    let report = Evaluator::new(config.bins).evaluate(&gold, &sets)?;
    report.write(&args.output)?;

    print!("{}", report.to_text());
    Ok(())
}
