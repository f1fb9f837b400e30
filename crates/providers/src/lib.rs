//! Provider implementations for Mindhaven.
//!
//! Both the primary completion model and the fast triage model speak the
//! OpenAI-compatible `/v1/chat/completions` protocol, so a single client
//! covers DeepSeek (chat) and Groq (triage).

mod openai_compat;

pub use openai_compat::OpenAiCompatClient;
