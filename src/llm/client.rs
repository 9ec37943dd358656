//! Chat completion client contract

use crate::llm::context::ChatMessage;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Remote language-model service.
///
/// Receives the full conversation and returns one completion. Network,
/// timeout and remote errors are reported as `CompletionFailed`.
#[async_trait]
pub trait ChatCompletionClient: Send + Sync {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String>;

    /// Get model name
    fn model_name(&self) -> &str;
}

#[async_trait]
impl<T: ChatCompletionClient + ?Sized> ChatCompletionClient for Arc<T> {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String> {
        (**self).complete(messages).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}
