//! Provider trait for the external text-generation service.
//!
//! The prediction pipeline only needs prompt-in/text-out. Providers
//! implement [`ChatProvider`]; decorators such as
//! [`RetryingChatProvider`](super::retry::RetryingChatProvider) wrap any
//! implementation, and tests substitute scripted providers.
//!
//! # Example
//!
//! ```ignore
//! async fn chat(&self, messages: &[Message], options: &GenerateOptions) -> Result<ChatResponse> {
//!     let reply = self.backend.complete(messages, options).await?;
//!     if reply.is_empty() {
//!         return Err(StanceError::EmptyResponse);
//!     }
//!     Ok(ChatResponse::text(reply))
//! }
//! ```

use async_trait::async_trait;

use crate::Result;
use crate::types::{ChatResponse, GenerateOptions, Message};

/// Provider for non-streaming chat completion.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider name for logging/debugging.
    fn name(&self) -> &str;

    /// Send a conversation and return the generated reply.
    ///
    /// Implementations map transport failures, timeouts and server errors
    /// to the transient [`StanceError`](crate::StanceError) variants so the
    /// retry decorator can act on them.
    async fn chat(&self, messages: &[Message], options: &GenerateOptions) -> Result<ChatResponse>;
}
