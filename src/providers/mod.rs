/*!
 * Provider implementations for translation services.
 *
 * This module contains the streaming client seam the pipeline consumes:
 * - OpenAI: any OpenAI-compatible chat-completions endpoint (SSE streaming)
 * - Mock: scriptable in-memory provider for tests
 */

use std::fmt::Debug;
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;

/// A lazy, finite, non-restartable sequence of response text fragments
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

/// One turn of a chat conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user or assistant)
    pub role: String,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// Create a system message
    pub fn system(content: &str) -> Self {
        Self { role: "system".to_string(), content: content.to_string() }
    }

    /// Create a user message
    pub fn user(content: &str) -> Self {
        Self { role: "user".to_string(), content: content.to_string() }
    }

    /// Create an assistant message
    pub fn assistant(content: &str) -> Self {
        Self { role: "assistant".to_string(), content: content.to_string() }
    }
}

/// Common trait for all streaming LLM providers
///
/// Implementations are used interchangeably by the translation service;
/// the trait is object safe so the service can hold a boxed provider.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Start a streaming chat completion for the given conversation
    ///
    /// # Arguments
    /// * `messages` - Conversation turns, system prompt first
    ///
    /// # Returns
    /// * A stream of text fragments, or an error if the call cannot start
    async fn chat_stream(&self, messages: Vec<ChatMessage>) -> Result<FragmentStream, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Model name this provider is configured for
    fn model(&self) -> &str;
}

pub mod mock;
pub mod openai;
