//! Memory manager trait — read-only access to a user's long-term memory.
//!
//! Memory extraction and consolidation happen elsewhere; the pipeline only
//! asks for a context block relevant to the current message and folds it
//! into the system prompt. Failures are tolerated: the orchestrator logs
//! and proceeds with an empty context.

use crate::error::MemoryError;
use async_trait::async_trait;

/// Read-only long-term memory collaborator.
#[async_trait]
pub trait MemoryManager: Send + Sync {
    /// The manager name (e.g., "keyword", "noop").
    fn name(&self) -> &str;

    /// Return a context block of this user's memories relevant to the
    /// current message. An empty string means "nothing relevant".
    async fn context_for(
        &self,
        user_id: &str,
        current_message: &str,
    ) -> std::result::Result<String, MemoryError>;
}
