//! Turn-level streaming events.
//!
//! `ChatStreamEvent` wraps the guarded response into events the gateway
//! forwards to clients over SSE: zero or more `chunk` events, then exactly
//! one `done` carrying the turn metadata packet, or an `error`.

use mindhaven_core::triage::{Emotion, Route, SafetyLevel, TriageOutcome};
use serde::{Deserialize, Serialize};

/// Events emitted by the orchestrator during a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatStreamEvent {
    /// Partial response text.
    Chunk { content: String },

    /// The turn is complete — final metadata packet.
    Done {
        conversation_id: String,
        metadata: TurnMetadata,
    },

    /// An error occurred mid-turn.
    Error { message: String },
}

impl ChatStreamEvent {
    /// SSE event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Chunk { .. } => "chunk",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }
}

/// The metadata packet closing every successful turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnMetadata {
    pub route: Route,
    pub safety: SafetyInfo,
    pub emotion: Emotion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment_stage: Option<String>,
    /// True when the triage classifier degraded to its default result.
    #[serde(default)]
    pub triage_fallback: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyInfo {
    pub label: SafetyLevel,
}

impl TurnMetadata {
    pub fn from_outcome(outcome: &TriageOutcome) -> Self {
        let result = outcome.result();
        Self {
            route: result.route,
            safety: SafetyInfo {
                label: result.safety_level,
            },
            emotion: result.emotion,
            assessment_stage: result.assessment_stage.clone(),
            triage_fallback: outcome.is_fallback(),
        }
    }
}
