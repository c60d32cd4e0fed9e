//! Public types for the stancelab API.

mod document;
mod generate;
mod message;
mod prediction;
mod stance;

pub use document::{Document, DocumentRecord};
pub use generate::{ChatResponse, GenerateOptions, Usage};
pub use message::{Message, Role};
pub use prediction::{Prediction, PredictionFailure, PredictionRun};
pub use stance::{BinScheme, STANCE_MAX, STANCE_MIN, StanceBin, in_stance_range};
