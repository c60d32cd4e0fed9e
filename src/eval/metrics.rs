//! Evaluation metrics over binned and raw stance scores.
//!
//! Classification metrics work on [`StanceBin`]s:
//! - Confusion matrix (rows = gold, columns = predicted, scheme order)
//! - Accuracy, per-class precision/recall/F1/support
//! - F1 macro (over every bin of the scheme), micro, weighted
//!
//! Regression metrics work on raw scores: MAE, MSE, Pearson r and
//! Spearman ρ. A correlation is `None` when either side has zero variance.

use serde::Serialize;

use crate::types::{BinScheme, StanceBin};

/// Confusion matrix for multi-class stance bins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfusionMatrix {
    pub labels: Vec<StanceBin>,
    /// `counts[gold][predicted]`, indexed like `labels`.
    pub counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    /// Build from paired bins. Bins outside `labels` are ignored.
    pub fn from_bins(labels: &[StanceBin], gold: &[StanceBin], predicted: &[StanceBin]) -> Self {
        let position = |bin: &StanceBin| labels.iter().position(|l| l == bin);
        let mut counts = vec![vec![0; labels.len()]; labels.len()];
        for (g, p) in gold.iter().zip(predicted) {
            if let (Some(row), Some(col)) = (position(g), position(p)) {
                counts[row][col] += 1;
            }
        }
        Self {
            labels: labels.to_vec(),
            counts,
        }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn correct(&self) -> usize {
        (0..self.labels.len()).map(|i| self.counts[i][i]).sum()
    }

    /// Gold count of class `i`.
    pub fn support(&self, i: usize) -> usize {
        self.counts[i].iter().sum()
    }

    /// Predicted count of class `i`.
    pub fn predicted(&self, i: usize) -> usize {
        self.counts.iter().map(|row| row[i]).sum()
    }
}

/// Precision, recall and F1 for one bin. Undefined ratios are 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub bin: StanceBin,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub f1_macro: f64,
    pub f1_micro: f64,
    pub f1_weighted: f64,
    pub per_class: Vec<ClassMetrics>,
    pub confusion_matrix: ConfusionMatrix,
}

impl ClassificationMetrics {
    /// Bin both sides with `scheme` and score. `None` for empty input.
    pub fn compute(scheme: &BinScheme, gold: &[f64], predicted: &[f64]) -> Option<Self> {
        if gold.is_empty() || gold.len() != predicted.len() {
            return None;
        }
        let gold_bins: Vec<StanceBin> = gold.iter().map(|&s| scheme.bin(s)).collect();
        let predicted_bins: Vec<StanceBin> = predicted.iter().map(|&s| scheme.bin(s)).collect();
        let cm = ConfusionMatrix::from_bins(scheme.bins(), &gold_bins, &predicted_bins);

        let total = cm.total();
        let accuracy = ratio(cm.correct(), total);

        let per_class: Vec<ClassMetrics> = cm
            .labels
            .iter()
            .enumerate()
            .map(|(i, &bin)| {
                let tp = cm.counts[i][i];
                let precision = ratio(tp, cm.predicted(i));
                let recall = ratio(tp, cm.support(i));
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    bin,
                    precision,
                    recall,
                    f1,
                    support: cm.support(i),
                }
            })
            .collect();

        // Bins absent from both sides count as F1 = 0.
        let f1_macro =
            per_class.iter().map(|m| m.f1).sum::<f64>() / per_class.len().max(1) as f64;
        let f1_weighted = per_class
            .iter()
            .map(|m| m.f1 * m.support as f64)
            .sum::<f64>()
            / total.max(1) as f64;

        Some(Self {
            accuracy,
            f1_macro,
            // Single-label: micro precision = micro recall = accuracy.
            f1_micro: accuracy,
            f1_weighted,
            per_class,
            confusion_matrix: cm,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionMetrics {
    pub mae: f64,
    pub mse: f64,
    pub pearson: Option<f64>,
    pub spearman: Option<f64>,
}

impl RegressionMetrics {
    /// `None` for empty input.
    pub fn compute(gold: &[f64], predicted: &[f64]) -> Option<Self> {
        if gold.is_empty() || gold.len() != predicted.len() {
            return None;
        }
        let n = gold.len() as f64;
        let mae = gold
            .iter()
            .zip(predicted)
            .map(|(g, p)| (g - p).abs())
            .sum::<f64>()
            / n;
        let mse = gold
            .iter()
            .zip(predicted)
            .map(|(g, p)| (g - p) * (g - p))
            .sum::<f64>()
            / n;
        Some(Self {
            mae,
            mse,
            pearson: pearson(gold, predicted),
            spearman: spearman(gold, predicted),
        })
    }
}

fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}

/// Pearson correlation; `None` with fewer than two points or zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

/// Spearman rank correlation with average ranks for ties.
pub fn spearman(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() {
        return None;
    }
    pearson(&average_ranks(x), &average_ranks(y))
}

/// 1-based ranks; tied values share the mean of their positions.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // Positions start..end share rank (start+1 + end) / 2.
        let rank = (start + 1 + end) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = rank;
        }
        start = end;
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn perfect_three_way_agreement() {
        let m = ClassificationMetrics::compute(&BinScheme::three_way(), &[1.0, -1.0], &[0.9, -0.8])
            .unwrap();
        assert!(approx(m.accuracy, 1.0));
        assert!(approx(m.f1_weighted, 1.0));
        // Neutral is absent from both sides and still counts in the macro average.
        assert_eq!(m.per_class[1].support, 0);
        assert!(approx(m.per_class[1].f1, 0.0));
        assert!(approx(m.f1_macro, 2.0 / 3.0));
    }

    #[test]
    fn macro_f1_averages_over_every_bin() {
        // Both documents are Supporting on both sides.
        let m = ClassificationMetrics::compute(&BinScheme::three_way(), &[0.9, 0.8], &[0.9, 0.7])
            .unwrap();
        assert!(approx(m.accuracy, 1.0));
        assert!(approx(m.f1_macro, 1.0 / 3.0));

        let m = ClassificationMetrics::compute(&BinScheme::five_way(), &[0.9, 0.8], &[0.9, 0.7])
            .unwrap();
        assert_eq!(m.per_class.len(), 6);
        assert!(approx(m.f1_macro, 1.0 / 6.0));
    }

    #[test]
    fn zero_scores_land_in_irrelevant_under_five_way() {
        let m = ClassificationMetrics::compute(&BinScheme::five_way(), &[0.0, 0.1], &[0.0, 0.0])
            .unwrap();
        let irrelevant = m.per_class.last().unwrap();
        assert_eq!(irrelevant.bin, StanceBin::Irrelevant);
        assert_eq!(irrelevant.support, 1);
        assert!(approx(irrelevant.recall, 1.0));
        assert!(approx(irrelevant.precision, 0.5));
        assert!(approx(m.accuracy, 0.5));
    }

    #[test]
    fn macro_and_weighted_f1() {
        // gold: O O N S ; pred: O N N N
        let gold = [-0.9, -0.5, 0.0, 0.8];
        let pred = [-0.9, 0.0, 0.1, 0.2];
        let m = ClassificationMetrics::compute(&BinScheme::three_way(), &gold, &pred).unwrap();
        assert!(approx(m.accuracy, 0.5));
        // O: p=1 r=.5 f1=2/3 ; N: p=1/3 r=1 f1=.5 ; S: 0
        assert!(approx(m.per_class[0].f1, 2.0 / 3.0));
        assert!(approx(m.per_class[1].f1, 0.5));
        assert!(approx(m.per_class[2].f1, 0.0));
        assert!(approx(m.f1_macro, (2.0 / 3.0 + 0.5) / 3.0));
        assert!(approx(m.f1_weighted, (2.0 / 3.0 * 2.0 + 0.5) / 4.0));
        assert_eq!(m.confusion_matrix.counts, vec![vec![1, 1, 0], vec![0, 1, 0], vec![0, 1, 0]]);
    }

    #[test]
    fn regression_scenario() {
        let m = RegressionMetrics::compute(&[1.0, -1.0], &[0.9, -0.8]).unwrap();
        assert!(approx(m.mae, 0.15));
        assert!(approx(m.mse, 0.025));
        assert!(approx(m.pearson.unwrap(), 1.0));
        assert!(approx(m.spearman.unwrap(), 1.0));
    }

    #[test]
    fn zero_variance_correlation_is_undefined() {
        assert_eq!(pearson(&[0.5, 0.5, 0.5], &[0.1, 0.2, 0.3]), None);
        assert_eq!(pearson(&[0.5], &[0.1]), None);
        let m = RegressionMetrics::compute(&[0.2, 0.2], &[0.1, 0.3]).unwrap();
        assert_eq!(m.pearson, None);
        assert_eq!(m.spearman, None);
    }

    #[test]
    fn ties_get_average_ranks() {
        assert_eq!(average_ranks(&[0.3, 0.1, 0.3, 0.2]), vec![3.5, 1.0, 3.5, 2.0]);
    }

    #[test]
    fn empty_input_has_no_metrics() {
        assert!(ClassificationMetrics::compute(&BinScheme::three_way(), &[], &[]).is_none());
        assert!(RegressionMetrics::compute(&[], &[]).is_none());
    }
}
