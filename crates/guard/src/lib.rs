//! Guardrails for the Mindhaven chat pipeline.
//!
//! Two synchronous checks wrap every turn:
//!
//! - [`InputGuard`] runs before any LLM call: length cap, prompt-injection
//!   phrases, suspicious payloads. A block short-circuits the turn with a
//!   fixed reply.
//! - [`OutputGuard`] runs on the completed generation: PII redaction,
//!   harmful-content detection, system-prompt-leak stripping. Idempotent.
//!
//! Blocked attempts are recorded in a bounded in-memory [`GuardAudit`] log.

mod audit;
mod input;
mod output;

pub use audit::{GuardAudit, GuardAuditEntry};
pub use input::InputGuard;
pub use output::OutputGuard;
