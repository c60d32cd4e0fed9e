//! Prompting predictor: scores documents through a generative service.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream;
use futures_util::{StreamExt, TryStreamExt};
use tracing::{debug, error, info, warn};

use super::progress::ProgressNotifier;
use crate::corpus::ExemplarSet;
use crate::error::ErrorKind;
use crate::prompt::{Strategy, extract_stance};
use crate::providers::ChatProvider;
use crate::telemetry;
use crate::types::{Document, GenerateOptions, Prediction, PredictionFailure, PredictionRun};
use crate::{Result, StanceError};

/// Default prompt budget: a 4096-token context minus 96 tokens for the reply.
const DEFAULT_PROMPT_BUDGET: usize = 4000;

/// Runs one [`Strategy`] over documents.
///
/// Per-document failures (call errors after retries, unparseable replies)
/// are recorded in the returned [`PredictionRun`] and never stop the batch.
/// Fatal errors such as an unknown model abort the run.
pub struct PromptingPredictor {
    provider: Arc<dyn ChatProvider>,
    strategy: Strategy,
    exemplars: Option<ExemplarSet>,
    options: GenerateOptions,
    prompt_budget: usize,
    concurrency: usize,
    pause: Duration,
    progress: Option<Arc<dyn ProgressNotifier>>,
}

impl PromptingPredictor {
    pub fn new(provider: Arc<dyn ChatProvider>, strategy: Strategy, options: GenerateOptions) -> Self {
        Self {
            provider,
            strategy,
            exemplars: None,
            options,
            prompt_budget: DEFAULT_PROMPT_BUDGET,
            concurrency: 1,
            pause: Duration::ZERO,
            progress: None,
        }
    }

    /// Demonstrations for few-shot strategies.
    pub fn with_exemplars(mut self, exemplars: ExemplarSet) -> Self {
        self.exemplars = Some(exemplars);
        self
    }

    /// Estimated token budget for each prompt.
    pub fn with_prompt_budget(mut self, budget: usize) -> Self {
        self.prompt_budget = budget;
        self
    }

    /// Documents in flight at once. Output order is unaffected.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Pause after each document.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Report per-document progress to `progress`.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressNotifier>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    fn exemplar_documents(&self) -> &[Document] {
        self.exemplars
            .as_ref()
            .map(ExemplarSet::documents)
            .unwrap_or_default()
    }

    /// Check that the strategy has what it needs before any call is made.
    pub fn ensure_ready(&self) -> Result<()> {
        if let Some(k) = self.strategy.exemplar_count() {
            let available = self.exemplar_documents().len();
            if available != k {
                return Err(StanceError::Configuration(format!(
                    "{} needs {k} exemplars, got {available}",
                    self.strategy
                )));
            }
        }
        Ok(())
    }

    /// Score one document.
    pub async fn predict(&self, document: &Document) -> Result<f64> {
        let exemplars = self.exemplar_documents();
        let mut analysis: Option<String> = None;
        let mut reply = String::new();

        for turn in 0..self.strategy.calls_per_document() {
            let fitted =
                self.strategy
                    .prompt(document, exemplars, analysis.as_deref(), self.prompt_budget);
            if fitted.truncated {
                debug!(id = %document.id, turn, "abstract truncated to fit prompt budget");
            }
            if !exemplars.is_empty() {
                metrics::histogram!(telemetry::EXEMPLARS_USED,
                    "strategy" => self.strategy.name(),
                )
                .record(fitted.exemplars_used as f64);
                if fitted.exemplars_used < exemplars.len() {
                    debug!(
                        id = %document.id,
                        used = fitted.exemplars_used,
                        available = exemplars.len(),
                        "exemplars dropped to fit prompt budget"
                    );
                }
            }
            let response = self.provider.chat(&fitted.messages, &self.options).await?;
            reply = response.content;
            if turn + 1 < self.strategy.calls_per_document() {
                analysis = Some(reply.clone());
            }
        }

        extract_stance(&reply)
    }

    /// Score every document, keeping input order.
    pub async fn predict_all(&self, documents: &[Document]) -> Result<PredictionRun> {
        self.ensure_ready()?;
        let strategy = self.strategy.name();
        info!(
            strategy = %strategy,
            provider = self.provider.name(),
            model = %self.options.model,
            documents = documents.len(),
            concurrency = self.concurrency,
            "starting prompting run"
        );

        if let Some(progress) = &self.progress {
            progress.on_start(documents.len());
        }

        let collected: Result<Vec<(&Document, Result<f64>)>> = stream::iter(documents)
            .map(|doc| async move {
                match self.predict(doc).await {
                    Err(e) if e.is_fatal() => {
                        error!(id = %doc.id, error = %e, "aborting prompting run");
                        Err(e)
                    }
                    outcome => {
                        if let Some(progress) = &self.progress {
                            progress.on_document(&doc.id, outcome.is_ok());
                        }
                        if !self.pause.is_zero() {
                            tokio::time::sleep(self.pause).await;
                        }
                        Ok((doc, outcome))
                    }
                }
            })
            .buffered(self.concurrency)
            .try_collect()
            .await;

        if let Some(progress) = &self.progress {
            progress.on_finish();
        }
        let outcomes = collected?;

        let mut run = PredictionRun::new(strategy.clone());
        for (doc, outcome) in outcomes {
            match outcome {
                Ok(score) => {
                    metrics::counter!(telemetry::PREDICTIONS_TOTAL,
                        "strategy" => strategy.clone(),
                        "status" => "ok",
                    )
                    .increment(1);
                    debug!(id = %doc.id, score, "predicted");
                    run.predictions.push(Prediction::new(doc.id.clone(), &strategy, score));
                }
                Err(e) => {
                    let status = match e.kind() {
                        ErrorKind::Parse => "parse_error",
                        _ => "call_error",
                    };
                    metrics::counter!(telemetry::PREDICTIONS_TOTAL,
                        "strategy" => strategy.clone(),
                        "status" => status,
                    )
                    .increment(1);
                    warn!(id = %doc.id, strategy = %strategy, error = %e, "no prediction for document");
                    run.failures
                        .push(PredictionFailure::from_error(doc.id.clone(), &strategy, &e));
                }
            }
        }

        info!(
            strategy = %strategy,
            predicted = run.predictions.len(),
            call_errors = run.failure_count(ErrorKind::Call),
            parse_errors = run.failure_count(ErrorKind::Parse),
            "prompting run complete"
        );
        Ok(run)
    }
}
