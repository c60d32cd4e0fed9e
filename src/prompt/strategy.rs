//! Prompting strategies and their conversation layouts.

use std::fmt;
use std::str::FromStr;

use super::template::{
    ANALYST_PROMPT, CHAIN_OF_STANCE_FINAL, CHAIN_OF_STANCE_STEPS, Fitted, INSTRUCTIONS,
    SYSTEM_PROMPT, conversation_tokens, fit_abstract, fit_to_budget, largest_fitting,
    render_exemplar, render_item, strip_html,
};
use crate::corpus::EXEMPLAR_SIZES;
use crate::types::{Document, Message};
use crate::{Result, StanceError};

/// How a document is turned into one or more generation calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Instructions and the target only.
    ZeroShot,
    /// Instructions, `k` labelled demonstrations, then the target.
    FewShot { k: usize },
    /// An analysis call followed by a scoring call that sees the analysis.
    ChainOfStance,
}

impl Strategy {
    /// Every strategy of the study, in reporting order.
    pub fn all() -> Vec<Strategy> {
        let mut all = vec![Strategy::ZeroShot];
        all.extend(EXEMPLAR_SIZES.iter().map(|&k| Strategy::FewShot { k }));
        all.push(Strategy::ChainOfStance);
        all
    }

    /// Name used in prediction records and file names.
    pub fn name(&self) -> String {
        match self {
            Strategy::ZeroShot => "zero-shot".to_string(),
            Strategy::FewShot { k } => format!("few-shot-{k}"),
            Strategy::ChainOfStance => "chain-of-stance".to_string(),
        }
    }

    pub fn calls_per_document(&self) -> usize {
        match self {
            Strategy::ChainOfStance => 2,
            _ => 1,
        }
    }

    /// Number of demonstrations the strategy needs, if any.
    pub fn exemplar_count(&self) -> Option<usize> {
        match self {
            Strategy::FewShot { k } => Some(*k),
            _ => None,
        }
    }

    /// Conversation for call `turn` (0-based) with the target abstract as given.
    ///
    /// `analysis` is the reply to the first chain-of-stance call and is only
    /// read on the second one.
    pub fn messages(
        &self,
        doc: &Document,
        exemplars: &[Document],
        analysis: Option<&str>,
        abstract_text: &str,
    ) -> Vec<Message> {
        let item = render_item(&doc.title, abstract_text);
        match self {
            Strategy::ZeroShot => vec![
                Message::system(SYSTEM_PROMPT),
                Message::user(format!("{INSTRUCTIONS}\n\n{item}\nOutput:")),
            ],
            Strategy::FewShot { .. } => {
                let demos = exemplars
                    .iter()
                    .map(render_exemplar)
                    .collect::<Vec<_>>()
                    .join("\n\n");
                vec![
                    Message::system(SYSTEM_PROMPT),
                    Message::user(format!(
                        "{INSTRUCTIONS}\n\nExamples:\n\n{demos}\n\nNow score this paper:\n\n{item}\nOutput:"
                    )),
                ]
            }
            Strategy::ChainOfStance => {
                let analysis_request = format!("{CHAIN_OF_STANCE_STEPS}\n\n{item}");
                match analysis {
                    None => vec![
                        Message::system(ANALYST_PROMPT),
                        Message::user(analysis_request),
                    ],
                    Some(trace) => vec![
                        Message::system(SYSTEM_PROMPT),
                        Message::user(analysis_request),
                        Message::assistant(trace),
                        Message::user(format!("{CHAIN_OF_STANCE_FINAL}\n\n{INSTRUCTIONS}")),
                    ],
                }
            }
        }
    }

    /// Conversation for one call, with the target abstract cleaned and
    /// truncated so the estimated size stays within `budget` tokens.
    ///
    /// Few-shot prompts keep the target first: it is fitted as if no
    /// demonstrations were present, then demonstrations are added in order
    /// while the prompt still fits. `Fitted::exemplars_used` reports how many.
    pub fn prompt(
        &self,
        doc: &Document,
        exemplars: &[Document],
        analysis: Option<&str>,
        budget: usize,
    ) -> Fitted {
        let cleaned = strip_html(&doc.abstract_text);
        if !matches!(self, Strategy::FewShot { .. }) || exemplars.is_empty() {
            return fit_to_budget(&cleaned, budget, |abstract_text| {
                self.messages(doc, exemplars, analysis, abstract_text)
            });
        }

        let (target, truncated) = fit_abstract(&cleaned, budget, |abstract_text| {
            self.messages(doc, &[], analysis, abstract_text)
        });
        let used = largest_fitting(exemplars.len(), |n| {
            conversation_tokens(&self.messages(doc, &exemplars[..n], analysis, &target)) <= budget
        });

        Fitted {
            messages: self.messages(doc, &exemplars[..used], analysis, &target),
            truncated,
            exemplars_used: used,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for Strategy {
    type Err = StanceError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        match normalized.as_str() {
            "zero-shot" => Ok(Strategy::ZeroShot),
            "chain-of-stance" => Ok(Strategy::ChainOfStance),
            other => other
                .strip_prefix("few-shot-")
                .and_then(|k| k.parse::<usize>().ok())
                .filter(|k| EXEMPLAR_SIZES.contains(k))
                .map(|k| Strategy::FewShot { k })
                .ok_or_else(|| {
                    StanceError::Configuration(format!(
                        "unknown strategy '{s}' (expected zero-shot, few-shot-10, few-shot-30, \
                         few-shot-50 or chain-of-stance)"
                    ))
                }),
        }
    }
}
