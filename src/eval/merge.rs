//! Merged dataset: gold labels side by side with every strategy's score.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::types::{BinScheme, Document, StanceBin};

/// One gold document with each strategy's prediction (`None` when absent).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRecord {
    pub id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub gold_stance: f64,
    pub gold_bin: StanceBin,
    pub predictions: BTreeMap<String, Option<f64>>,
}

/// Join gold documents with per-strategy predictions keyed by id.
///
/// Records follow gold order; strategies are keyed by name.
pub fn merge(
    scheme: &BinScheme,
    gold: &[Document],
    strategies: &[(String, HashMap<String, f64>)],
) -> Vec<MergedRecord> {
    gold.iter()
        .map(|doc| MergedRecord {
            id: doc.id.clone(),
            title: doc.title.clone(),
            abstract_text: doc.abstract_text.clone(),
            gold_stance: doc.stance,
            gold_bin: scheme.bin(doc.stance),
            predictions: strategies
                .iter()
                .map(|(name, scores)| (name.clone(), scores.get(&doc.id).copied()))
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_prediction_is_null() {
        let gold = vec![
            Document::new("1", "a", "x", 1.0),
            Document::new("2", "b", "y", -1.0),
        ];
        let scores: HashMap<String, f64> = [("1".to_string(), 0.9)].into_iter().collect();
        let merged = merge(&BinScheme::three_way(), &gold, &[("zero-shot".into(), scores)]);
        assert_eq!(merged[0].predictions["zero-shot"], Some(0.9));
        assert_eq!(merged[1].predictions["zero-shot"], None);
        assert_eq!(merged[1].gold_bin, StanceBin::Opposing);

        let json = serde_json::to_value(&merged[1]).unwrap();
        assert!(json["predictions"]["zero-shot"].is_null());
        assert_eq!(json["abstract"], "y");
    }
}
