//! Prediction records produced by the predictors.

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, StanceError};

/// A stance prediction for one document under one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub strategy: String,
    pub predicted_stance: f64,
}

impl Prediction {
    pub fn new(id: impl Into<String>, strategy: impl Into<String>, predicted_stance: f64) -> Self {
        Self {
            id: id.into(),
            strategy: strategy.into(),
            predicted_stance,
        }
    }
}

/// A document for which no prediction was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionFailure {
    pub id: String,
    pub strategy: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl PredictionFailure {
    pub fn from_error(id: impl Into<String>, strategy: impl Into<String>, err: &StanceError) -> Self {
        Self {
            id: id.into(),
            strategy: strategy.into(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Outcome of running one strategy over a batch of documents.
#[derive(Debug, Clone, Default)]
pub struct PredictionRun {
    pub strategy: String,
    pub predictions: Vec<Prediction>,
    pub failures: Vec<PredictionFailure>,
}

impl PredictionRun {
    pub fn new(strategy: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            ..Self::default()
        }
    }

    /// Number of failures of the given kind.
    pub fn failure_count(&self, kind: ErrorKind) -> usize {
        self.failures.iter().filter(|f| f.kind == kind).count()
    }
}
