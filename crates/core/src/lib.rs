//! # Mindhaven Core
//!
//! Domain types, traits, and error definitions for the Mindhaven
//! safety-and-routing chat pipeline. This crate has **zero framework
//! dependencies** — it defines the domain model that all other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator is defined as a trait here. Implementations live in
//! their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod guard;
pub mod memory;
pub mod message;
pub mod persona;
pub mod provider;
pub mod store;
pub mod triage;

// Re-export key types at crate root for ergonomics
pub use error::{Error, MemoryError, ProviderError, Result, StoreError};
pub use guard::{InputBlockReason, InputDecision, OutputDecision, OutputIssue};
pub use memory::MemoryManager;
pub use message::{Conversation, ConversationId, Message, Role};
pub use persona::Persona;
pub use provider::{ChatChunk, ChatProvider, ChatRequest, TriageProvider, TriageRequest, Usage};
pub use store::{GoldenExample, GoldenExampleCurator, GoldenExampleStore, MessageStore, NewMessage};
pub use triage::{Emotion, EmotionLabel, Route, SafetyLevel, TriageFallback, TriageOutcome, TriageResult};
