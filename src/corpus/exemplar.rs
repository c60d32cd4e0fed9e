//! Few-shot exemplar selection.

use std::collections::HashSet;

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

use crate::types::Document;
use crate::{Result, StanceError};

/// Exemplar set sizes used by the few-shot strategies.
pub const EXEMPLAR_SIZES: [usize; 3] = [10, 30, 50];

/// Demonstration documents for few-shot prompting.
///
/// Selection is a seeded shuffle of the training split with every document
/// whose content also appears in the evaluation split removed first, so the
/// set is deterministic and never leaks evaluation data.
#[derive(Debug, Clone, PartialEq)]
pub struct ExemplarSet {
    exemplars: Vec<Document>,
    seed: u64,
}

impl ExemplarSet {
    /// Select `k` exemplars from `training`, disjoint from `evaluation`.
    pub fn select(
        training: &[Document],
        evaluation: &[Document],
        k: usize,
        seed: u64,
    ) -> Result<Self> {
        if k == 0 {
            return Err(StanceError::Configuration(
                "exemplar set size must be positive".into(),
            ));
        }

        let held_out: HashSet<String> = evaluation.iter().map(Document::content_key).collect();
        let mut candidates: Vec<&Document> = training
            .iter()
            .filter(|doc| !held_out.contains(&doc.content_key()))
            .collect();

        let dropped = training.len() - candidates.len();
        if dropped > 0 {
            warn!(dropped, "training documents also present in evaluation split skipped");
        }

        if candidates.len() < k {
            return Err(StanceError::Configuration(format!(
                "need {k} exemplars but only {} eligible training documents",
                candidates.len()
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        candidates.shuffle(&mut rng);
        let exemplars: Vec<Document> = candidates.into_iter().take(k).cloned().collect();

        debug!(k, seed, "selected exemplar set");
        Ok(Self { exemplars, seed })
    }

    pub fn documents(&self) -> &[Document] {
        &self.exemplars
    }

    pub fn len(&self) -> usize {
        self.exemplars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exemplars.is_empty()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Whether no exemplar shares content with any of `documents`.
    pub fn is_disjoint_from(&self, documents: &[Document]) -> bool {
        let keys: HashSet<String> = documents.iter().map(Document::content_key).collect();
        self.exemplars
            .iter()
            .all(|doc| !keys.contains(&doc.content_key()))
    }
}
