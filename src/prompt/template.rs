//! Prompt text, input cleaning and prompt-size budgeting.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{Document, Message};

/// System instruction for calls that must end in a score.
pub const SYSTEM_PROMPT: &str = "Return only a single valid JSON object with keys \
\"stance_score\" and \"stance_category\". No extra text.";

/// System instruction for the analysis call of chain-of-stance.
pub const ANALYST_PROMPT: &str = "You are a careful reviewer of scientific abstracts. \
Answer in concise prose.";

/// Task header shared by every strategy.
pub const INSTRUCTIONS: &str = "Question: Is the technology or solution described in \
the paper environmentally friendly?\n\n\
Return ONLY a JSON object with keys \"stance_score\" (float in [-1.0,1.0], where -1.0 \
is strongly against and 1.0 strongly in favor of environmental sustainability) and \
\"stance_category\" (one of [\"Strongly Pro\",\"Pro\",\"Neutral\",\"Contra\",\"Strongly Contra\"]).";

/// Reasoning steps elicited by the first chain-of-stance call.
pub const CHAIN_OF_STANCE_STEPS: &str = "Analyze the abstract below using the following \
reasoning steps:\n\n\
1. Context Understanding: What domain is the paper in? What is the solution proposed?\n\
2. Main Viewpoint: What is the core idea or conclusion?\n\
3. Tone and Emotion: What emotional or evaluative language is used?\n\
4. Stance Comparison: Compare the text to each possible stance (positive, neutral, negative).\n\
5. Logical Inference: Based on the above, what is the likely position of the paper \
toward environmental sustainability?\n\n\
Write one short paragraph per step. Do not give a numeric score yet.";

/// Final request of chain-of-stance, sent after the analysis.
pub const CHAIN_OF_STANCE_FINAL: &str = "Based on your analysis, give the final stance \
score from -1.0 to 1.0.";

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag pattern is a valid regex"));

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").expect("entity pattern is a valid regex")
});

/// Remove HTML tags, decode common entities and collapse whitespace.
///
/// Titles in the corpus carry markup such as `MgH<sub>2</sub>`.
pub fn strip_html(text: &str) -> String {
    let without_tags = TAG.replace_all(text, " ");
    let decoded = ENTITY.replace_all(&without_tags, |caps: &regex::Captures<'_>| {
        decode_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string())
    });
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entity(name: &str) -> Option<String> {
    let decoded = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or(name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(code)?
        }
    };
    Some(decoded.to_string())
}

/// Render a document as a prompt item.
pub fn render_item(title: &str, abstract_text: &str) -> String {
    format!(
        "Title: {}\nAbstract: {}",
        strip_html(title),
        strip_html(abstract_text)
    )
}

/// Render a labelled demonstration for few-shot prompts.
pub fn render_exemplar(doc: &Document) -> String {
    format!(
        "{}\nOutput: {{\"stance_score\": {:.2}}}",
        render_item(&doc.title, &doc.abstract_text),
        doc.stance
    )
}

/// Rough token estimate for budgeting.
///
/// The larger of ~4 characters per token and ~0.75 words per token.
pub fn estimate_tokens(text: &str) -> usize {
    let by_chars = text.chars().count().div_ceil(4);
    let by_words = (text.split_whitespace().count() * 4).div_ceil(3);
    by_chars.max(by_words)
}

/// Estimated size of a whole conversation.
pub fn conversation_tokens(messages: &[Message]) -> usize {
    messages.iter().map(|m| estimate_tokens(&m.content) + 4).sum()
}

/// Render a conversation, truncating the target abstract so it fits `budget`.
///
/// `render` builds the conversation from a (possibly truncated) abstract.
/// The longest word-prefix that fits is kept and marked with an ellipsis.
/// When even an empty abstract does not fit, the empty-abstract version is
/// returned and `truncated` reports it.
pub fn fit_to_budget<F>(abstract_text: &str, budget: usize, render: F) -> Fitted
where
    F: Fn(&str) -> Vec<Message>,
{
    let (kept, truncated) = fit_abstract(abstract_text, budget, &render);
    Fitted {
        messages: render(&kept),
        truncated,
        exemplars_used: 0,
    }
}

/// Longest version of `abstract_text` whose rendering fits `budget`.
pub(crate) fn fit_abstract<F>(abstract_text: &str, budget: usize, render: F) -> (String, bool)
where
    F: Fn(&str) -> Vec<Message>,
{
    if conversation_tokens(&render(abstract_text)) <= budget {
        return (abstract_text.to_string(), false);
    }

    let words: Vec<&str> = abstract_text.split_whitespace().collect();
    let candidate = |n: usize| {
        if n == 0 {
            String::new()
        } else {
            format!("{} …", words[..n].join(" "))
        }
    };

    // Binary search for the longest prefix that fits.
    let (mut lo, mut hi) = (0usize, words.len());
    while lo < hi {
        let mid = (lo + hi).div_ceil(2);
        if conversation_tokens(&render(&candidate(mid))) <= budget {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }

    (candidate(lo), true)
}

/// Largest `n <= max` for which `fits(n)` holds, given `fits` is monotone
/// decreasing in `n`. Returns 0 when nothing fits.
pub(crate) fn largest_fitting<F>(max: usize, fits: F) -> usize
where
    F: Fn(usize) -> bool,
{
    let (mut lo, mut hi) = (0usize, max);
    while lo < hi {
        let mid = (lo + hi).div_ceil(2);
        if fits(mid) {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    lo
}

/// A conversation after budgeting.
#[derive(Debug, Clone)]
pub struct Fitted {
    pub messages: Vec<Message>,
    /// The target abstract was shortened.
    pub truncated: bool,
    /// Demonstrations that made it into the prompt.
    pub exemplars_used: usize,
}
