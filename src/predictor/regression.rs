//! Supervised regression predictor.
//!
//! Documents are embedded as L2-normalized TF-IDF vectors and scored by a
//! single bounded head, `tanh(w·x + b)`, trained with a weighted
//! mean-squared error and Adam. Sample weights come from an inverse kernel
//! density estimate of the gold labels so that rare stances count more.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::types::{Document, Prediction};
use crate::{Result, StanceError};

/// Strategy name used for regression predictions.
pub const STRATEGY_NAME: &str = "regression";

/// Hyper-parameters of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Passes over the training portion (default: 30).
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    /// Documents per optimizer step (default: 16).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Adam step size (default: 0.05).
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// Seed for the validation split and batch shuffling (default: 42).
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Fraction held out for validation, in [0, 1) (default: 0.2).
    #[serde(default = "default_validation_split")]
    pub validation_split: f64,
    /// Weight samples by inverse label density (default: true).
    #[serde(default = "default_sample_weighting")]
    pub sample_weighting: bool,
    /// Kernel bandwidth of the label density estimate (default: 0.1).
    #[serde(default = "default_bandwidth")]
    pub bandwidth: f64,
    /// Vocabulary cap (default: 5000).
    #[serde(default = "default_max_features")]
    pub max_features: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            batch_size: default_batch_size(),
            learning_rate: default_learning_rate(),
            seed: default_seed(),
            validation_split: default_validation_split(),
            sample_weighting: default_sample_weighting(),
            bandwidth: default_bandwidth(),
            max_features: default_max_features(),
        }
    }
}

fn default_epochs() -> usize {
    30
}

fn default_batch_size() -> usize {
    16
}

fn default_learning_rate() -> f64 {
    0.05
}

fn default_seed() -> u64 {
    42
}

fn default_validation_split() -> f64 {
    0.2
}

fn default_sample_weighting() -> bool {
    true
}

fn default_bandwidth() -> f64 {
    0.1
}

fn default_max_features() -> usize {
    5000
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(StanceError::Configuration(format!("training.{msg}")));
        if self.epochs == 0 {
            return invalid("epochs must be at least 1");
        }
        if self.batch_size == 0 {
            return invalid("batch_size must be at least 1");
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return invalid("learning_rate must be positive");
        }
        if !(0.0..1.0).contains(&self.validation_split) {
            return invalid("validation_split must be in [0, 1)");
        }
        if !(self.bandwidth.is_finite() && self.bandwidth > 0.0) {
            return invalid("bandwidth must be positive");
        }
        if self.max_features == 0 {
            return invalid("max_features must be at least 1");
        }
        Ok(())
    }
}

/// Lower-cased alphanumeric tokens longer than two characters.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| s.chars().count() > 2)
        .map(|s| s.to_string())
        .collect()
}

/// Sparse vector: `(feature index, value)` pairs in index order.
pub type SparseVector = Vec<(usize, f64)>;

/// TF-IDF feature extractor fitted on a training split.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TfIdfVectorizer {
    terms: Vec<String>,
    idf: Vec<f64>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl TfIdfVectorizer {
    /// Build the vocabulary from `texts`, keeping the `max_features` terms
    /// with the highest document frequency (ties broken alphabetically).
    pub fn fit<S: AsRef<str>>(texts: &[S], max_features: usize) -> Self {
        let mut df: HashMap<String, usize> = HashMap::new();
        for text in texts {
            let unique: HashSet<String> = tokenize(text.as_ref()).into_iter().collect();
            for term in unique {
                *df.entry(term).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(String, usize)> = df.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(max_features);
        ranked.sort_by(|a, b| a.0.cmp(&b.0));

        let n_docs = texts.len() as f64;
        let (terms, idf): (Vec<String>, Vec<f64>) = ranked
            .into_iter()
            .map(|(term, count)| {
                let idf = ((1.0 + n_docs) / (1.0 + count as f64)).ln() + 1.0;
                (term, idf)
            })
            .unzip();

        let mut vectorizer = Self {
            terms,
            idf,
            index: HashMap::new(),
        };
        vectorizer.reindex();
        vectorizer
    }

    fn reindex(&mut self) {
        self.index = self
            .terms
            .iter()
            .enumerate()
            .map(|(i, term)| (term.clone(), i))
            .collect();
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// L2-normalized TF-IDF vector of `text`. Unknown terms are ignored.
    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for token in tokenize(text) {
            if let Some(&i) = self.index.get(&token) {
                *counts.entry(i).or_insert(0.0) += 1.0;
            }
        }

        let mut vector: SparseVector = counts
            .into_iter()
            .map(|(i, tf)| (i, tf * self.idf[i]))
            .collect();
        vector.sort_by_key(|&(i, _)| i);

        let norm = vector.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, v) in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

/// Per-sample weights from an inverse Gaussian kernel density estimate of
/// `labels`, min-max scaled into [1, 10]. Equal densities give all ones.
pub fn density_weights(labels: &[f64], bandwidth: f64) -> Vec<f64> {
    if labels.is_empty() {
        return Vec::new();
    }
    let n = labels.len() as f64;
    let norm = (2.0 * std::f64::consts::PI).sqrt() * bandwidth * n;
    let inverse: Vec<f64> = labels
        .iter()
        .map(|&y| {
            let density = labels
                .iter()
                .map(|&other| {
                    let z = (y - other) / bandwidth;
                    (-0.5 * z * z).exp()
                })
                .sum::<f64>()
                / norm;
            1.0 / density
        })
        .collect();

    let min = inverse.iter().copied().fold(f64::INFINITY, f64::min);
    let max = inverse.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range <= f64::EPSILON * max.abs().max(1.0) {
        return vec![1.0; labels.len()];
    }
    inverse
        .into_iter()
        .map(|w| 1.0 + 9.0 * (w - min) / range)
        .collect()
}

/// Adam optimizer over a flat parameter vector.
#[derive(Debug, Clone)]
struct Adam {
    lr: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    t: i32,
    m: Vec<f64>,
    v: Vec<f64>,
}

impl Adam {
    fn new(lr: f64, n_params: usize) -> Self {
        Self {
            lr,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            t: 0,
            m: vec![0.0; n_params],
            v: vec![0.0; n_params],
        }
    }

    fn step(&mut self, params: &mut [f64], grads: &[f64]) {
        self.t += 1;
        let bias1 = 1.0 - self.beta1.powi(self.t);
        let bias2 = 1.0 - self.beta2.powi(self.t);
        for (i, (param, &grad)) in params.iter_mut().zip(grads).enumerate() {
            self.m[i] = self.beta1 * self.m[i] + (1.0 - self.beta1) * grad;
            self.v[i] = self.beta2 * self.v[i] + (1.0 - self.beta2) * grad * grad;
            let m_hat = self.m[i] / bias1;
            let v_hat = self.v[i] / bias2;
            *param -= self.lr * m_hat / (v_hat.sqrt() + self.epsilon);
        }
    }
}

/// Summary of a training run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub train_size: usize,
    pub validation_size: usize,
    pub vocabulary_size: usize,
    pub epochs: usize,
    /// Weighted training loss of the last epoch.
    pub final_loss: f64,
    /// Mean absolute error on the validation portion, if there is one.
    pub validation_mae: Option<f64>,
}

/// Trained regression predictor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StanceRegressor {
    vectorizer: TfIdfVectorizer,
    weights: Vec<f64>,
    bias: f64,
}

impl StanceRegressor {
    /// Train on `documents`. The same documents and config always give the
    /// same model.
    pub fn train(documents: &[Document], config: &TrainingConfig) -> Result<(Self, TrainingReport)> {
        config.validate()?;
        if documents.is_empty() {
            return Err(StanceError::Configuration("training split is empty".into()));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let mut order: Vec<usize> = (0..documents.len()).collect();
        order.shuffle(&mut rng);
        let validation_size =
            ((documents.len() as f64 * config.validation_split).floor() as usize).min(documents.len() - 1);
        let (validation_idx, train_idx) = order.split_at(validation_size);

        let train_texts: Vec<String> = train_idx.iter().map(|&i| documents[i].text()).collect();
        let vectorizer = TfIdfVectorizer::fit(&train_texts, config.max_features);
        let features: Vec<SparseVector> = train_texts.iter().map(|t| vectorizer.transform(t)).collect();
        let labels: Vec<f64> = train_idx.iter().map(|&i| documents[i].stance).collect();
        let sample_weights = if config.sample_weighting {
            density_weights(&labels, config.bandwidth)
        } else {
            vec![1.0; labels.len()]
        };

        info!(
            train = train_idx.len(),
            validation = validation_size,
            vocabulary = vectorizer.len(),
            epochs = config.epochs,
            "training regression predictor"
        );

        // Parameters: one weight per feature, then the bias.
        let n_features = vectorizer.len();
        let mut params = vec![0.0; n_features + 1];
        let mut adam = Adam::new(config.learning_rate, params.len());
        let mut grads = vec![0.0; params.len()];
        let mut batch_order: Vec<usize> = (0..features.len()).collect();
        let mut final_loss = 0.0;

        for epoch in 0..config.epochs {
            batch_order.shuffle(&mut rng);
            let mut epoch_loss = 0.0;
            let mut epoch_weight = 0.0;

            for batch in batch_order.chunks(config.batch_size) {
                grads.iter_mut().for_each(|g| *g = 0.0);
                let batch_weight: f64 = batch.iter().map(|&i| sample_weights[i]).sum();

                for &i in batch {
                    let x = &features[i];
                    let prediction = score(&params[..n_features], params[n_features], x);
                    let error = prediction - labels[i];
                    let w = sample_weights[i];
                    epoch_loss += w * error * error;
                    epoch_weight += w;

                    let dz = 2.0 * w * error * (1.0 - prediction * prediction) / batch_weight;
                    for &(j, value) in x {
                        grads[j] += dz * value;
                    }
                    grads[n_features] += dz;
                }
                adam.step(&mut params, &grads);
            }

            final_loss = epoch_loss / epoch_weight;
            debug!(epoch = epoch + 1, loss = final_loss, "epoch complete");
        }

        let bias = params.pop().unwrap_or(0.0);
        let model = Self {
            vectorizer,
            weights: params,
            bias,
        };

        let validation_mae = if validation_idx.is_empty() {
            None
        } else {
            let total: f64 = validation_idx
                .iter()
                .map(|&i| (model.predict(&documents[i]) - documents[i].stance).abs())
                .sum();
            Some(total / validation_idx.len() as f64)
        };

        let report = TrainingReport {
            train_size: train_idx.len(),
            validation_size,
            vocabulary_size: n_features,
            epochs: config.epochs,
            final_loss,
            validation_mae,
        };
        info!(
            loss = report.final_loss,
            validation_mae = ?report.validation_mae,
            "training complete"
        );
        Ok((model, report))
    }

    /// Predicted stance in [-1, 1]. A document without text scores 0.0.
    pub fn predict(&self, document: &Document) -> f64 {
        if document.is_blank() {
            return 0.0;
        }
        let x = self.vectorizer.transform(&document.text());
        score(&self.weights, self.bias, &x)
    }

    /// Predict every document in input order.
    pub fn predict_all(&self, documents: &[Document]) -> Vec<Prediction> {
        documents
            .iter()
            .map(|doc| Prediction::new(doc.id.clone(), STRATEGY_NAME, self.predict(doc)))
            .collect()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vectorizer.len()
    }

    /// Save the model as JSON (atomic write via tmp + rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        super::writer::write_json_atomic(path, self)
    }

    /// Load a model saved by [`save`](Self::save).
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            StanceError::Configuration(format!("failed to read model file {path:?}: {e}"))
        })?;
        let mut model: Self = serde_json::from_str(&content).map_err(|e| {
            StanceError::Configuration(format!("invalid model file {path:?}: {e}"))
        })?;
        if model.weights.len() != model.vectorizer.len()
            || model.vectorizer.idf.len() != model.vectorizer.terms.len()
        {
            return Err(StanceError::Configuration(format!(
                "model file {path:?} has mismatched dimensions"
            )));
        }
        model.vectorizer.reindex();
        Ok(model)
    }
}

fn score(weights: &[f64], bias: f64, x: &SparseVector) -> f64 {
    let z: f64 = x.iter().map(|&(j, value)| weights[j] * value).sum::<f64>() + bias;
    z.tanh()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_drops_short_words() {
        assert_eq!(
            tokenize("CO2 is a Greenhouse-gas, an issue"),
            vec!["co2", "greenhouse", "gas", "issue"]
        );
    }

    #[test]
    fn vectorizer_caps_vocabulary_and_normalizes() {
        let texts = ["solar solar wind", "solar coal", "solar wind coal oil"];
        let vectorizer = TfIdfVectorizer::fit(&texts, 2);
        assert_eq!(vectorizer.len(), 2);
        let x = vectorizer.transform("solar wind unknown");
        let norm: f64 = x.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
        assert!(vectorizer.transform("nothing known here").is_empty());
    }

    #[test]
    fn rare_labels_get_larger_weights() {
        let labels = [0.0, 0.0, 0.05, -0.05, 0.9];
        let weights = density_weights(&labels, 0.1);
        assert!(weights.iter().all(|w| (1.0..=10.0).contains(w)));
        assert!((weights[4] - 10.0).abs() < 1e-9);
        assert!(weights[4] > weights[0]);
    }

    #[test]
    fn uniform_labels_get_unit_weights() {
        assert_eq!(density_weights(&[0.5, 0.5, 0.5], 0.1), vec![1.0; 3]);
        assert!(density_weights(&[], 0.1).is_empty());
    }

    #[test]
    fn adam_moves_against_gradient() {
        let mut adam = Adam::new(0.1, 2);
        let mut params = vec![0.0, 0.0];
        adam.step(&mut params, &[1.0, -1.0]);
        assert!(params[0] < 0.0 && params[1] > 0.0);
    }

    #[test]
    fn invalid_config_rejected() {
        let config = TrainingConfig {
            validation_split: 1.0,
            ..TrainingConfig::default()
        };
        assert!(config.validate().is_err());
        let config = TrainingConfig {
            batch_size: 0,
            ..TrainingConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
