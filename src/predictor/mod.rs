//! Stance predictors and the prediction writer.

pub mod progress;
pub mod prompting;
pub mod regression;
pub mod writer;

pub use progress::ProgressNotifier;
pub use prompting::PromptingPredictor;
pub use regression::{StanceRegressor, TrainingConfig, TrainingReport};
