//! Progress notifications for long prediction runs.

/// Receives per-document progress from a predictor.
///
/// Implementations must be cheap; they are called from the worker pool.
pub trait ProgressNotifier: Send + Sync {
    /// A run over `total` documents is starting.
    fn on_start(&self, total: usize);

    /// One document finished, with or without a prediction.
    fn on_document(&self, id: &str, predicted: bool);

    /// The run ended, successfully or not.
    fn on_finish(&self);
}
