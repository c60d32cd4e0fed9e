//! stance-prompt: run one prompting strategy over an evaluation split.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use stancelab::corpus::{ExemplarSet, load_documents};
use stancelab::predictor::ProgressNotifier;
use stancelab::predictor::writer::{failures_path, write_run};
use stancelab::{
    Config, ErrorKind, OllamaClient, PromptingPredictor, RetryingChatProvider, StanceError,
    Strategy,
};
use tracing::info;

/// Prompting stance predictor
#[derive(Parser)]
#[command(name = "stance-prompt")]
#[command(version)]
#[command(about = "Score an evaluation split with a prompting strategy")]
struct Args {
    /// zero-shot, few-shot-10, few-shot-30, few-shot-50 or chain-of-stance
    #[arg(short, long)]
    strategy: Strategy,

    /// Evaluation split (JSON array of {id?, title, abstract, stance})
    #[arg(short, long)]
    input: PathBuf,

    /// Prediction file to write
    #[arg(short, long)]
    output: PathBuf,

    /// Training split to draw few-shot exemplars from
    #[arg(short, long)]
    train: Option<PathBuf>,

    /// Model name (overrides service.model)
    #[arg(short, long, env = "STANCELAB_MODEL")]
    model: Option<String>,

    /// Service URL (overrides service.base_url and OLLAMA_HOST)
    #[arg(long)]
    base_url: Option<String>,

    /// Documents in flight at once (overrides run.concurrency)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Config file (default: ./stancelab.toml, then ~/.stancelab/config.toml)
    #[arg(short, long, env = "STANCELAB_CONFIG")]
    config: Option<PathBuf>,
}

/// Progress bar over the documents of one run.
struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    fn new(strategy: Strategy) -> Result<Self, indicatif::style::TemplateError> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {elapsed_precise} {msg}")?
                .progress_chars("=>-"),
        );
        bar.set_prefix(strategy.name());
        Ok(Self { bar })
    }
}

impl ProgressNotifier for ProgressReporter {
    fn on_start(&self, total: usize) {
        self.bar.set_length(total as u64);
    }

    fn on_document(&self, id: &str, predicted: bool) {
        let status = if predicted { "ok" } else { "failed" };
        self.bar.set_message(format!("{id}: {status}"));
        self.bar.inc(1);
    }

    fn on_finish(&self) {
        self.bar.finish_with_message("done");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: info; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(model) = args.model {
        config.service.model = model;
    }
    if let Some(base_url) = args.base_url {
        config.service.base_url = base_url;
    }
    if let Some(concurrency) = args.concurrency {
        config.run.concurrency = concurrency;
    }
    config.validate()?;

    let documents = load_documents(&args.input)?;

    let client = OllamaClient::with_base_url(&config.service.base_url, config.service.timeout())?;
    let provider = RetryingChatProvider::new(Arc::new(client), config.retry_config())
        .with_timeout(config.service.timeout());

    let mut predictor = PromptingPredictor::new(
        Arc::new(provider),
        args.strategy,
        config.generation.options(&config.service.model),
    )
    .with_prompt_budget(config.generation.prompt_budget())
    .with_concurrency(config.run.concurrency)
    .with_pause(Duration::from_millis(config.run.pause_ms))
    .with_progress(Arc::new(ProgressReporter::new(args.strategy)?));

    if let Some(k) = args.strategy.exemplar_count() {
        let train_path = args.train.as_ref().ok_or_else(|| {
            StanceError::Configuration(format!("{} requires --train", args.strategy))
        })?;
        let training = load_documents(train_path)?;
        let exemplars = ExemplarSet::select(&training, &documents, k, config.exemplars.seed)?;
        info!(k, seed = exemplars.seed(), "exemplar set ready");
        predictor = predictor.with_exemplars(exemplars);
    }

    let run = predictor.predict_all(&documents).await?;
    write_run(&args.output, &run)?;

    println!(
        "{}: {} predictions, {} call errors, {} parse errors",
        run.strategy,
        run.predictions.len(),
        run.failure_count(ErrorKind::Call),
        run.failure_count(ErrorKind::Parse)
    );
    if !run.failures.is_empty() {
        println!("failures written to {}", failures_path(&args.output).display());
    }
    Ok(())
}
