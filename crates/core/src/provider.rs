//! Provider traits — the abstraction over LLM backends.
//!
//! Two distinct seams:
//! - [`ChatProvider`] — the primary completion model that generates the
//!   assistant's reply, streamed token by token.
//! - [`TriageProvider`] — the fast, cheap model used for the per-turn
//!   classification pass (temperature 0, bounded output).
//!
//! Both are implemented by OpenAI-compatible HTTP backends in
//! `mindhaven-providers`; tests supply mocks.

use crate::error::ProviderError;
use crate::message::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A request to the primary completion model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The composed system prompt (persona + memory + examples + safety)
    pub system_prompt: String,

    /// The conversation turns, oldest first
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

/// A request to the triage model. Temperature is pinned to 0 by the
/// implementation; it is not a caller choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageRequest {
    /// Classification instructions (strict JSON output)
    pub system_prompt: String,

    /// The message to classify, with role-tagged recent history appended
    pub user_prompt: String,

    /// Output length bound
    pub max_tokens: u32,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A single chunk in a streaming completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChunk {
    /// Partial content delta
    #[serde(default)]
    pub content: Option<String>,

    /// Whether this is the final chunk
    #[serde(default)]
    pub done: bool,

    /// Usage info (typically only in the final chunk)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// The primary completion model.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// A human-readable name for this provider (e.g., "deepseek").
    fn name(&self) -> &str;

    /// Send a request and get the complete response text.
    async fn complete(&self, request: ChatRequest) -> std::result::Result<String, ProviderError>;

    /// Send a request and get a stream of response chunks.
    ///
    /// Default implementation calls `complete()` and wraps the result as a
    /// single chunk.
    async fn stream(
        &self,
        request: ChatRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<ChatChunk, ProviderError>>,
        ProviderError,
    > {
        let text = self.complete(request).await?;
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        let _ = tx
            .send(Ok(ChatChunk {
                content: Some(text),
                done: true,
                usage: None,
            }))
            .await;
        Ok(rx)
    }
}

/// The fast triage model. Returns the raw completion text, which the
/// classifier is responsible for parsing (and recovering from).
#[async_trait]
pub trait TriageProvider: Send + Sync {
    /// A human-readable name for this provider (e.g., "groq").
    fn name(&self) -> &str;

    async fn classify(&self, request: TriageRequest)
    -> std::result::Result<String, ProviderError>;
}
