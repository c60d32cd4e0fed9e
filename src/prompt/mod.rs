//! Prompt construction and reply parsing for the prompting predictor.

mod parse;
mod strategy;
mod template;

pub use parse::{extract_stance, parse_stance};
pub use strategy::Strategy;
pub use template::{Fitted, conversation_tokens, estimate_tokens, strip_html};
