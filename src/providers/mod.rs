//! Generative service providers and decorators.

pub mod ollama;
pub mod retry;
pub mod traits;

pub use ollama::OllamaClient;
pub use retry::{RetryConfig, RetryingChatProvider};
pub use traits::ChatProvider;
