//! Evaluation of prediction sets against gold labels.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use super::merge::{MergedRecord, merge};
use super::metrics::{ClassificationMetrics, RegressionMetrics};
use crate::corpus::ensure_unique_ids;
use crate::predictor::writer::{is_failures_file, read_predictions, write_json_atomic};
use crate::telemetry;
use crate::types::{BinScheme, Document, Prediction, in_stance_range};
use crate::{Result, StanceError};

/// File names written by [`EvaluationReport::write`].
pub const RESULTS_TEXT: &str = "evaluation_results.txt";
pub const SUMMARY_JSON: &str = "summary.json";
pub const MERGED_JSON: &str = "merged.json";

/// All predictions of one strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionSet {
    pub strategy: String,
    pub predictions: Vec<Prediction>,
}

impl PredictionSet {
    pub fn new(strategy: impl Into<String>, predictions: Vec<Prediction>) -> Self {
        Self {
            strategy: strategy.into(),
            predictions,
        }
    }

    /// Load a prediction file; the strategy is the file stem.
    pub fn load(path: &Path) -> Result<Self> {
        let strategy = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                StanceError::Configuration(format!("cannot name strategy from {path:?}"))
            })?
            .to_string();
        Ok(Self::new(strategy, read_predictions(path)?))
    }

    /// Load every `*.json` prediction file in `dir`, sorted by file name.
    ///
    /// Failure sidecars and the evaluator's own [`SUMMARY_JSON`] and
    /// [`MERGED_JSON`] are skipped, so `dir` may also be the output directory.
    pub fn load_dir(dir: &Path) -> Result<Vec<Self>> {
        let entries = fs::read_dir(dir).map_err(|e| {
            StanceError::Configuration(format!("cannot read predictions dir {dir:?}: {e}"))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_json = path.extension().is_some_and(|ext| ext == "json");
            if path.is_file() && is_json && !is_failures_file(&path) && !is_report_file(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            return Err(StanceError::Configuration(format!(
                "no prediction files in {dir:?}"
            )));
        }
        paths.iter().map(|p| Self::load(p)).collect()
    }
}

fn is_report_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name == SUMMARY_JSON || name == MERGED_JSON)
}

/// Metrics for one strategy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategySummary {
    pub strategy: String,
    /// Gold documents with a prediction.
    pub evaluated: usize,
    /// Gold documents without one.
    pub excluded: usize,
    pub classification: Option<ClassificationMetrics>,
    pub regression: Option<RegressionMetrics>,
}

/// Result of one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub scheme: BinScheme,
    pub gold_documents: usize,
    pub strategies: Vec<StrategySummary>,
    #[serde(skip)]
    pub merged: Vec<MergedRecord>,
}

/// Scores prediction sets against a gold split with a fixed [`BinScheme`].
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    scheme: BinScheme,
}

impl Evaluator {
    pub fn new(scheme: BinScheme) -> Self {
        Self { scheme }
    }

    pub fn scheme(&self) -> &BinScheme {
        &self.scheme
    }

    /// Evaluate every set. Fails on duplicate or unknown ids.
    pub fn evaluate(&self, gold: &[Document], sets: &[PredictionSet]) -> Result<EvaluationReport> {
        self.scheme.validate()?;
        ensure_unique_ids(gold)?;
        let gold_ids: HashSet<&str> = gold.iter().map(|d| d.id.as_str()).collect();

        let mut names = HashSet::new();
        let mut indexed: Vec<(String, HashMap<String, f64>)> = Vec::with_capacity(sets.len());
        for set in sets {
            if !names.insert(set.strategy.as_str()) {
                return Err(StanceError::DataIntegrity(format!(
                    "strategy {:?} appears twice",
                    set.strategy
                )));
            }
            indexed.push((set.strategy.clone(), index_set(set, &gold_ids)?));
        }

        let strategies = indexed
            .iter()
            .map(|(name, scores)| self.summarize(name, gold, scores))
            .collect();

        Ok(EvaluationReport {
            scheme: self.scheme,
            gold_documents: gold.len(),
            strategies,
            merged: merge(&self.scheme, gold, &indexed),
        })
    }

    fn summarize(&self, strategy: &str, gold: &[Document], scores: &HashMap<String, f64>) -> StrategySummary {
        let mut gold_scores = Vec::with_capacity(scores.len());
        let mut predicted = Vec::with_capacity(scores.len());
        for doc in gold {
            if let Some(&score) = scores.get(&doc.id) {
                gold_scores.push(doc.stance);
                predicted.push(score);
            }
        }
        let evaluated = predicted.len();
        let excluded = gold.len() - evaluated;

        if excluded > 0 {
            metrics::counter!(telemetry::EXCLUDED_TOTAL, "strategy" => strategy.to_owned())
                .increment(excluded as u64);
            warn!(strategy, excluded, "documents without prediction excluded");
        }
        info!(strategy, evaluated, excluded, "evaluated strategy");

        StrategySummary {
            strategy: strategy.to_string(),
            evaluated,
            excluded,
            classification: ClassificationMetrics::compute(&self.scheme, &gold_scores, &predicted),
            regression: RegressionMetrics::compute(&gold_scores, &predicted),
        }
    }
}

fn index_set(set: &PredictionSet, gold_ids: &HashSet<&str>) -> Result<HashMap<String, f64>> {
    let mut scores = HashMap::with_capacity(set.predictions.len());
    for prediction in &set.predictions {
        if !gold_ids.contains(prediction.id.as_str()) {
            return Err(StanceError::DataIntegrity(format!(
                "{}: prediction for unknown document id {:?}",
                set.strategy, prediction.id
            )));
        }
        if !in_stance_range(prediction.predicted_stance) {
            return Err(StanceError::DataIntegrity(format!(
                "{}: prediction {} for {:?} outside [-1, 1]",
                set.strategy, prediction.predicted_stance, prediction.id
            )));
        }
        if scores
            .insert(prediction.id.clone(), prediction.predicted_stance)
            .is_some()
        {
            return Err(StanceError::DataIntegrity(format!(
                "{}: duplicate prediction for document id {:?}",
                set.strategy, prediction.id
            )));
        }
    }
    Ok(scores)
}

impl EvaluationReport {
    pub fn strategy(&self, name: &str) -> Option<&StrategySummary> {
        self.strategies.iter().find(|s| s.strategy == name)
    }

    /// Human-readable summary.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let bins = self
            .scheme
            .bins()
            .iter()
            .map(|b| b.label())
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "Evaluation results");
        let _ = writeln!(out, "==================");
        let _ = writeln!(out, "Gold documents: {}", self.gold_documents);
        let _ = writeln!(out, "Bins: {bins}");

        for summary in &self.strategies {
            let _ = writeln!(out);
            let _ = writeln!(out, "== {} ==", summary.strategy);
            let _ = writeln!(
                out,
                "Evaluated: {}  Excluded: {}",
                summary.evaluated, summary.excluded
            );

            match &summary.classification {
                Some(c) => {
                    let _ = writeln!(out, "Accuracy:    {:.4}", c.accuracy);
                    let _ = writeln!(out, "F1 macro:    {:.4}", c.f1_macro);
                    let _ = writeln!(out, "F1 micro:    {:.4}", c.f1_micro);
                    let _ = writeln!(out, "F1 weighted: {:.4}", c.f1_weighted);
                    let _ = writeln!(out, "Per class:");
                    for m in &c.per_class {
                        let _ = writeln!(
                            out,
                            "  {:<20} P={:.4} R={:.4} F1={:.4} support={}",
                            m.bin.label(),
                            m.precision,
                            m.recall,
                            m.f1,
                            m.support
                        );
                    }
                    let _ = writeln!(out, "Confusion matrix (rows = gold, columns = predicted):");
                    for (bin, row) in c.confusion_matrix.labels.iter().zip(&c.confusion_matrix.counts) {
                        let cells = row
                            .iter()
                            .map(|n| format!("{n:>5}"))
                            .collect::<String>();
                        let _ = writeln!(out, "  {:<20}{cells}", bin.label());
                    }
                }
                None => {
                    let _ = writeln!(out, "No predictions to evaluate.");
                }
            }

            if let Some(r) = &summary.regression {
                let _ = writeln!(
                    out,
                    "MAE: {:.4}  MSE: {:.4}  Pearson r: {}  Spearman rho: {}",
                    r.mae,
                    r.mse,
                    format_correlation(r.pearson),
                    format_correlation(r.spearman)
                );
            }
        }
        out
    }

    /// Write the text summary, JSON summary and merged dataset into `dir`.
    pub fn write(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        fs::write(dir.join(RESULTS_TEXT), self.to_text())?;
        write_json_atomic(&dir.join(SUMMARY_JSON), self)?;
        write_json_atomic(&dir.join(MERGED_JSON), &self.merged)?;
        info!(dir = %dir.display(), strategies = self.strategies.len(), "wrote evaluation outputs");
        Ok(())
    }
}

fn format_correlation(value: Option<f64>) -> String {
    value.map_or_else(|| "undefined".to_string(), |v| format!("{v:.4}"))
}
