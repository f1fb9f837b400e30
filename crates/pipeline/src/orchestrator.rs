//! The turn orchestrator — the per-turn state machine.
//!
//! Sequence: input guard → triage → context (memory + examples, both
//! best-effort) → prompt composition → generation → output guard →
//! persistence.
//!
//! Streaming strategy: the provider stream is fully buffered, the output
//! guard runs on the complete text, and only then is the guarded text
//! re-chunked to the client. No unguarded token can reach the client;
//! first-token latency is the cost. If the client disconnects mid-delivery
//! the sends fail silently and persistence still runs, so the stored
//! conversation stays consistent.

use crate::composer;
use crate::stream_event::{ChatStreamEvent, TurnMetadata};
use mindhaven_core::error::Error;
use mindhaven_core::guard::{InputBlockReason, OutputIssue};
use mindhaven_core::memory::MemoryManager;
use mindhaven_core::message::{Message, Role};
use mindhaven_core::persona::Persona;
use mindhaven_core::provider::{ChatProvider, ChatRequest};
use mindhaven_core::store::{MessageStore, NewMessage};
use mindhaven_core::triage::TriageOutcome;
use mindhaven_guard::{GuardAudit, InputGuard, OutputGuard};
use mindhaven_retrieval::ExampleCache;
use mindhaven_triage::TriageClassifier;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Characters per re-emitted chunk.
const CHUNK_CHARS: usize = 48;

/// Maximum characters of the first user message used as the title.
const TITLE_CHARS: usize = 20;

/// One incoming turn.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    /// Existing conversation (omit to create a new one)
    pub conversation_id: Option<String>,
    pub user_id: String,
    pub persona: Persona,
    pub message: String,
    /// Prior turns supplied by the client, oldest first
    pub history: Vec<Message>,
}

/// The orchestrator's answer: a guard short-circuit delivered whole, or a
/// stream of events.
pub enum TurnResponse {
    /// Input guard block — a complete, fixed reply. Not an error.
    Blocked {
        content: String,
        reason: InputBlockReason,
    },
    /// Normal turn — events arrive on the receiver.
    Stream {
        conversation_id: String,
        rx: mpsc::Receiver<ChatStreamEvent>,
    },
}

/// Orchestrates the safety-and-routing pipeline for each turn.
pub struct TurnOrchestrator {
    input_guard: Arc<InputGuard>,
    output_guard: Arc<OutputGuard>,
    audit: Arc<GuardAudit>,
    classifier: Arc<TriageClassifier>,
    examples: Arc<ExampleCache>,
    memory: Arc<dyn MemoryManager>,
    store: Arc<dyn MessageStore>,
    chat: Arc<dyn ChatProvider>,
    temperature: f32,
    max_tokens: Option<u32>,
    top_k: usize,
}

impl TurnOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        input_guard: Arc<InputGuard>,
        output_guard: Arc<OutputGuard>,
        audit: Arc<GuardAudit>,
        classifier: Arc<TriageClassifier>,
        examples: Arc<ExampleCache>,
        memory: Arc<dyn MemoryManager>,
        store: Arc<dyn MessageStore>,
        chat: Arc<dyn ChatProvider>,
    ) -> Self {
        Self {
            input_guard,
            output_guard,
            audit,
            classifier,
            examples,
            memory,
            store,
            chat,
            temperature: 0.7,
            max_tokens: None,
            top_k: 3,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Run one turn.
    ///
    /// Validation failures and store failures on conversation resolution
    /// surface as errors; a guard block is a successful `Blocked` response.
    pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnResponse, Error> {
        if request.message.trim().is_empty() {
            return Err(Error::validation("message must not be empty"));
        }

        // ── Step 1: input guard (synchronous, before any LLM call) ──
        let decision = self.input_guard.evaluate(&request.message);
        if let Some(reason) = decision.reason {
            self.audit.record(&request.user_id, reason, &request.message);
            return Ok(TurnResponse::Blocked {
                content: reason.canned_response().into(),
                reason,
            });
        }

        // Resolve the conversation up front so the caller gets its id.
        let conversation = match &request.conversation_id {
            Some(id) => self
                .store
                .get_conversation(id)
                .await?
                .ok_or_else(|| Error::validation(format!("unknown conversation: {id}")))?,
            None => self.store.create_conversation(&request.user_id).await?,
        };
        let conversation_id = conversation.id.0.clone();
        let derive_title = conversation.is_new();

        info!(
            conversation_id = %conversation_id,
            user_id = %request.user_id,
            "Turn accepted"
        );

        let (tx, rx) = mpsc::channel(64);
        let task = TurnTask {
            output_guard: self.output_guard.clone(),
            classifier: self.classifier.clone(),
            examples: self.examples.clone(),
            memory: self.memory.clone(),
            store: self.store.clone(),
            chat: self.chat.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_k: self.top_k,
            conversation_id: conversation_id.clone(),
            derive_title,
            request,
        };
        tokio::spawn(task.run(tx));

        Ok(TurnResponse::Stream {
            conversation_id,
            rx,
        })
    }
}

/// Everything one spawned turn needs, cloned out of the orchestrator.
struct TurnTask {
    output_guard: Arc<OutputGuard>,
    classifier: Arc<TriageClassifier>,
    examples: Arc<ExampleCache>,
    memory: Arc<dyn MemoryManager>,
    store: Arc<dyn MessageStore>,
    chat: Arc<dyn ChatProvider>,
    temperature: f32,
    max_tokens: Option<u32>,
    top_k: usize,
    conversation_id: String,
    derive_title: bool,
    request: TurnRequest,
}

impl TurnTask {
    async fn run(self, tx: mpsc::Sender<ChatStreamEvent>) {
        // ── Step 2: triage (fail-open, never errors) ──
        let outcome = self
            .classifier
            .analyze(&self.request.message, &self.request.history)
            .await;
        let triage = outcome.result().clone();
        debug!(
            route = triage.route.as_str(),
            safety = triage.safety_level.as_str(),
            fallback = outcome.is_fallback(),
            "Triage complete"
        );

        // ── Step 3: context (best-effort, tolerated failures) ──
        let memory_context = match self
            .memory
            .context_for(&self.request.user_id, &self.request.message)
            .await
        {
            Ok(context) => context,
            Err(e) => {
                warn!(error = %e, "Memory context fetch failed, proceeding without");
                String::new()
            }
        };
        let examples = self.examples.retrieve(&self.request.message, self.top_k).await;

        // ── Step 4: compose ──
        let system_prompt = composer::compose(
            &self.request.persona,
            &memory_context,
            &examples,
            triage.route,
        );

        // ── Step 5: generate (fully buffered before delivery) ──
        let mut turn_messages: Vec<Message> = self
            .request
            .history
            .iter()
            .filter(|m| m.role != Role::System)
            .cloned()
            .collect();
        turn_messages.push(Message::user(&self.request.message));

        let chat_request = ChatRequest {
            system_prompt,
            messages: turn_messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let mut stream = match self.chat.stream(chat_request).await {
            Ok(stream) => stream,
            Err(e) => {
                error!(error = %e, "Completion provider failed");
                let _ = tx
                    .send(ChatStreamEvent::Error {
                        message: "生成回复时出现问题，请稍后再试。".into(),
                    })
                    .await;
                self.persist_user_message_only().await;
                return;
            }
        };

        let mut full_text = String::new();
        while let Some(chunk) = stream.recv().await {
            match chunk {
                Ok(chunk) => {
                    if let Some(content) = chunk.content {
                        full_text.push_str(&content);
                    }
                    if chunk.done {
                        break;
                    }
                }
                Err(e) => {
                    error!(error = %e, "Completion stream interrupted");
                    let _ = tx
                        .send(ChatStreamEvent::Error {
                            message: "生成回复时连接中断，请稍后再试。".into(),
                        })
                        .await;
                    self.persist_user_message_only().await;
                    return;
                }
            }
        }

        if full_text.is_empty() {
            // Never deliver a silent empty reply.
            error!("Completion provider returned empty text");
            let _ = tx
                .send(ChatStreamEvent::Error {
                    message: "生成回复时出现问题，请稍后再试。".into(),
                })
                .await;
            self.persist_user_message_only().await;
            return;
        }

        // ── Step 6: output guard on the complete text ──
        let decision = self.output_guard.evaluate(&full_text);
        let final_text = if decision.safe {
            decision.redacted.clone()
        } else {
            warn!(issues = ?decision.issues, "Substituting safe fallback for flagged generation");
            OutputGuard::safe_fallback().to_string()
        };

        // Deliver the guarded text. A dropped receiver is not an error —
        // the turn still persists below.
        for chunk in rechunk(&final_text, CHUNK_CHARS) {
            if tx
                .send(ChatStreamEvent::Chunk { content: chunk })
                .await
                .is_err()
            {
                debug!("Client disconnected mid-stream, continuing to persist");
                break;
            }
        }
        let _ = tx
            .send(ChatStreamEvent::Done {
                conversation_id: self.conversation_id.clone(),
                metadata: TurnMetadata::from_outcome(&outcome),
            })
            .await;

        // ── Step 7: persist ──
        self.persist_turn(&outcome, &decision.issues, &final_text).await;
    }

    /// Persist only the user message (generation failed).
    async fn persist_user_message_only(&self) {
        if let Err(e) = self
            .store
            .create_message(NewMessage {
                conversation_id: self.conversation_id.clone(),
                role: Role::User,
                content: self.request.message.clone(),
                metadata: serde_json::Map::new(),
            })
            .await
        {
            error!(error = %e, "Failed to persist user message");
        }
        self.maybe_derive_title().await;
    }

    /// Persist the user and assistant messages with triage metadata.
    async fn persist_turn(
        &self,
        outcome: &TriageOutcome,
        issues: &[OutputIssue],
        final_text: &str,
    ) {
        if let Err(e) = self
            .store
            .create_message(NewMessage {
                conversation_id: self.conversation_id.clone(),
                role: Role::User,
                content: self.request.message.clone(),
                metadata: serde_json::Map::new(),
            })
            .await
        {
            error!(error = %e, "Failed to persist user message");
        }
        self.maybe_derive_title().await;

        let mut metadata = outcome.result().to_metadata();
        metadata.insert(
            "triage_fallback".into(),
            serde_json::json!(outcome.is_fallback()),
        );
        if !issues.is_empty() {
            metadata.insert("guard_issues".into(), serde_json::json!(issues));
        }

        if let Err(e) = self
            .store
            .create_message(NewMessage {
                conversation_id: self.conversation_id.clone(),
                role: Role::Assistant,
                content: final_text.to_string(),
                metadata,
            })
            .await
        {
            error!(error = %e, "Failed to persist assistant message");
        }
    }

    async fn maybe_derive_title(&self) {
        if !self.derive_title {
            return;
        }
        let title = derive_title(&self.request.message);
        if let Err(e) = self
            .store
            .update_conversation_title(&self.conversation_id, &title)
            .await
        {
            error!(error = %e, "Failed to set conversation title");
        }
    }
}

/// First characters of the first user message, ellipsized.
fn derive_title(message: &str) -> String {
    let trimmed = message.trim();
    if trimmed.chars().count() <= TITLE_CHARS {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(TITLE_CHARS).collect();
        format!("{head}…")
    }
}

/// Split text into chunks of at most `size` characters, on char boundaries.
fn rechunk(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size)
        .map(|c| c.iter().collect::<String>())
        .collect()
}
