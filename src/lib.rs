//! stancelab - stance detection in scientific abstracts
//!
//! Compares a supervised regression predictor against prompting strategies
//! run on a locally hosted generative model, and evaluates every strategy's
//! predictions against gold stance labels in [-1, 1].
//!
//! # Prompting Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stancelab::{Config, OllamaClient, PromptingPredictor, RetryingChatProvider, Strategy};
//!
//! #[tokio::main]
//! async fn main() -> stancelab::Result<()> {
//!     let config = Config::load(None)?;
//!     let client = OllamaClient::with_base_url(&config.service.base_url, config.service.timeout())?;
//!     let provider = RetryingChatProvider::new(Arc::new(client), config.retry_config());
//!
//!     let documents = stancelab::corpus::load_documents("eval.json".as_ref())?;
//!     let predictor = PromptingPredictor::new(
//!         Arc::new(provider),
//!         Strategy::ZeroShot,
//!         config.generation.options(&config.service.model),
//!     );
//!     let run = predictor.predict_all(&documents).await?;
//!     println!("{} predictions, {} failures", run.predictions.len(), run.failures.len());
//!     Ok(())
//! }
//! ```
//!
//! # Evaluation Example
//!
//! ```rust,no_run
//! use stancelab::{Evaluator, PredictionSet, types::BinScheme};
//!
//! # fn main() -> stancelab::Result<()> {
//! let gold = stancelab::corpus::load_documents("eval.json".as_ref())?;
//! let sets = PredictionSet::load_dir("predictions".as_ref())?;
//! let report = Evaluator::new(BinScheme::three_way()).evaluate(&gold, &sets)?;
//! report.write("results".as_ref())?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod corpus;
pub mod error;
pub mod eval;
pub mod predictor;
pub mod prompt;
pub mod providers;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use config::Config;
pub use error::{ErrorKind, Result, StanceError};
pub use eval::{EvaluationReport, Evaluator, PredictionSet};
pub use predictor::{PromptingPredictor, StanceRegressor, TrainingConfig};
pub use prompt::{Strategy, parse_stance};
pub use providers::{ChatProvider, OllamaClient, RetryConfig, RetryingChatProvider};

// Re-export all types
pub use types::{
    BinScheme, ChatResponse, Document, GenerateOptions, Message, Prediction, PredictionFailure,
    PredictionRun, Role, StanceBin, Usage,
};
