//! Runtime wiring — builds the pipeline stack from configuration.
//!
//! One place constructs providers, guards, stores, and the orchestrator so
//! `serve` and `chat` share identical wiring.

use mindhaven_config::AppConfig;
use mindhaven_core::persona::Persona;
use mindhaven_guard::{GuardAudit, InputGuard, OutputGuard};
use mindhaven_memory::{InMemoryExampleStore, InMemoryMessageStore, KeywordMemoryManager};
use mindhaven_pipeline::TurnOrchestrator;
use mindhaven_providers::OpenAiCompatClient;
use mindhaven_retrieval::{ExampleCache, SystemClock};
use mindhaven_triage::TriageClassifier;
use std::collections::HashMap;
use std::sync::Arc;

/// The assembled service stack.
pub struct Runtime {
    pub orchestrator: Arc<TurnOrchestrator>,
    pub store: Arc<InMemoryMessageStore>,
    pub examples: Arc<InMemoryExampleStore>,
    pub audit: Arc<GuardAudit>,
    pub personas: HashMap<String, Persona>,
}

/// Build the full stack from configuration.
pub fn build(config: &AppConfig) -> Runtime {
    let chat_provider = Arc::new(OpenAiCompatClient::new(
        "deepseek",
        config.chat.api_url.clone(),
        config.chat.api_key.clone(),
        config.chat.model.clone(),
    ));
    let triage_provider = Arc::new(OpenAiCompatClient::new(
        "groq",
        config.triage.api_url.clone(),
        config.triage.api_key.clone(),
        config.triage.model.clone(),
    ));

    let store = Arc::new(InMemoryMessageStore::new());
    let examples = Arc::new(InMemoryExampleStore::new());
    let audit = Arc::new(GuardAudit::new());

    let orchestrator = Arc::new(
        TurnOrchestrator::new(
            Arc::new(InputGuard::new(config.guard.max_message_chars)),
            Arc::new(OutputGuard::new()),
            audit.clone(),
            Arc::new(TriageClassifier::new(
                triage_provider,
                config.triage.max_tokens,
                config.triage.history_turns,
            )),
            Arc::new(ExampleCache::new(
                examples.clone(),
                config.retrieval.ttl_secs,
                Arc::new(SystemClock),
            )),
            Arc::new(KeywordMemoryManager::new()),
            store.clone(),
            chat_provider,
        )
        .with_temperature(config.chat.temperature)
        .with_max_tokens(config.chat.max_tokens)
        .with_top_k(config.retrieval.top_k),
    );

    let mut personas: HashMap<String, Persona> = config
        .personas
        .iter()
        .map(|(id, p)| {
            (
                id.clone(),
                Persona::new(id.clone(), p.name.clone(), p.base_prompt.clone()),
            )
        })
        .collect();
    let default = Persona::default_counselor();
    personas.entry(default.id.clone()).or_insert(default);

    Runtime {
        orchestrator,
        store,
        examples,
        audit,
        personas,
    }
}
