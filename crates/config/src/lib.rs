//! Configuration loading, validation, and management for Mindhaven.
//!
//! Loads configuration from a TOML file with environment variable overrides
//! for secrets (`MINDHAVEN_CHAT_API_KEY`, `MINDHAVEN_TRIAGE_API_KEY`).
//! Validates settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// The root configuration structure.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Primary completion provider (DeepSeek-compatible)
    #[serde(default)]
    pub chat: ChatProviderConfig,

    /// Fast triage provider (Groq-compatible)
    #[serde(default)]
    pub triage: TriageProviderConfig,

    /// Input/output guardrail settings
    #[serde(default)]
    pub guard: GuardConfig,

    /// Golden-example retrieval settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Gateway (HTTP server) settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Named personas, keyed by persona id
    #[serde(default)]
    pub personas: HashMap<String, PersonaConfig>,
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("chat", &self.chat)
            .field("triage", &self.triage)
            .field("guard", &self.guard)
            .field("retrieval", &self.retrieval)
            .field("gateway", &self.gateway)
            .field("personas", &self.personas.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ChatProviderConfig {
    /// API key; overridden by MINDHAVEN_CHAT_API_KEY
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_chat_url")]
    pub api_url: String,

    #[serde(default = "default_chat_model")]
    pub model: String,

    #[serde(default = "default_chat_temperature")]
    pub temperature: f32,

    #[serde(default = "default_chat_max_tokens")]
    pub max_tokens: u32,
}

fn default_chat_url() -> String {
    "https://api.deepseek.com/v1".into()
}
fn default_chat_model() -> String {
    "deepseek-chat".into()
}
fn default_chat_temperature() -> f32 {
    0.7
}
fn default_chat_max_tokens() -> u32 {
    2048
}

impl Default for ChatProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_chat_url(),
            model: default_chat_model(),
            temperature: default_chat_temperature(),
            max_tokens: default_chat_max_tokens(),
        }
    }
}

impl std::fmt::Debug for ChatProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct TriageProviderConfig {
    /// API key; overridden by MINDHAVEN_TRIAGE_API_KEY
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_triage_url")]
    pub api_url: String,

    #[serde(default = "default_triage_model")]
    pub model: String,

    #[serde(default = "default_triage_max_tokens")]
    pub max_tokens: u32,

    /// How many recent turns to include as classification context
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,
}

fn default_triage_url() -> String {
    "https://api.groq.com/openai/v1".into()
}
fn default_triage_model() -> String {
    "llama-3.1-8b-instant".into()
}
fn default_triage_max_tokens() -> u32 {
    512
}
fn default_history_turns() -> usize {
    6
}

impl Default for TriageProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_triage_url(),
            model: default_triage_model(),
            max_tokens: default_triage_max_tokens(),
            history_turns: default_history_turns(),
        }
    }
}

impl std::fmt::Debug for TriageProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriageProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("history_turns", &self.history_turns)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Maximum accepted message length, in characters
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
}

fn default_max_message_chars() -> usize {
    2000
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            max_message_chars: default_max_message_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Example cache time-to-live, in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// How many examples to retrieve per turn
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_ttl_secs() -> u64 {
    600
}
fn default_top_k() -> usize {
    3
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            top_k: default_top_k(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer tokens accepted on /v1 routes. Empty means auth is disabled
    /// (local development only).
    #[serde(default)]
    pub bearer_tokens: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    43180
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bearer_tokens: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    pub name: String,
    pub base_prompt: String,
}

impl AppConfig {
    /// Load configuration from a TOML file, then apply environment
    /// variable overrides for secrets.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: AppConfig = toml::from_str(&raw)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides — used when no config file
    /// exists.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("MINDHAVEN_CHAT_API_KEY") {
            if !key.is_empty() {
                self.chat.api_key = Some(key);
            }
        }
        if let Ok(key) = std::env::var("MINDHAVEN_TRIAGE_API_KEY") {
            if !key.is_empty() {
                self.triage.api_key = Some(key);
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.guard.max_message_chars == 0 {
            return Err(ConfigError::Invalid(
                "guard.max_message_chars must be positive".into(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::Invalid(
                "retrieval.top_k must be positive".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.chat.temperature) {
            return Err(ConfigError::Invalid(
                "chat.temperature must be within 0.0..=2.0".into(),
            ));
        }
        for (id, persona) in &self.personas {
            if persona.base_prompt.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "persona '{id}' has an empty base_prompt"
                )));
            }
        }
        Ok(())
    }
}
