//! The Mindhaven safety-and-routing pipeline.
//!
//! One turn flows through a strict sequence:
//!
//! 1. **Guard** — input guard; a block short-circuits with a fixed reply
//! 2. **Triage** — fast classification (fail-open)
//! 3. **Context** — memory context + golden examples (best-effort)
//! 4. **Compose** — persona system prompt assembly
//! 5. **Generate** — streamed completion, fully buffered
//! 6. **Post-guard** — output guard on the complete text
//! 7. **Persist** — user and assistant messages with triage metadata

pub mod composer;
pub mod orchestrator;
pub mod stream_event;

pub use orchestrator::{TurnOrchestrator, TurnRequest, TurnResponse};
pub use stream_event::{ChatStreamEvent, SafetyInfo, TurnMetadata};
