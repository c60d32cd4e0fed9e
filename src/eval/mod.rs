//! Evaluator/aggregator: metrics per strategy and the merged dataset.

mod evaluator;
mod merge;
pub mod metrics;

pub use evaluator::{
    EvaluationReport, Evaluator, MERGED_JSON, PredictionSet, RESULTS_TEXT, SUMMARY_JSON,
    StrategySummary,
};
pub use merge::{MergedRecord, merge};
pub use metrics::{ClassMetrics, ClassificationMetrics, ConfusionMatrix, RegressionMetrics};
