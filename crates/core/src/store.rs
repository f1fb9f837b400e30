//! Persistence collaborator traits — the message store and the curated
//! golden-example store.
//!
//! Implementations live in `mindhaven-memory`. Within one conversation the
//! store must serialize message creation in arrival order; nothing here
//! requires transactions beyond single-row operations.

use crate::error::StoreError;
use crate::message::{Conversation, Message, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The fields needed to persist one message.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: String,
    pub role: Role,
    pub content: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Conversation and message persistence.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Create an empty conversation for a user.
    async fn create_conversation(
        &self,
        user_id: &str,
    ) -> std::result::Result<Conversation, StoreError>;

    /// Append a message to a conversation. Fails if the conversation does
    /// not exist.
    async fn create_message(&self, new: NewMessage) -> std::result::Result<Message, StoreError>;

    /// Set or replace a conversation's title.
    async fn update_conversation_title(
        &self,
        conversation_id: &str,
        title: &str,
    ) -> std::result::Result<(), StoreError>;

    /// Fetch a conversation with its messages.
    async fn get_conversation(
        &self,
        conversation_id: &str,
    ) -> std::result::Result<Option<Conversation>, StoreError>;

    /// List a user's conversations, most recently updated first.
    async fn list_conversations(
        &self,
        user_id: &str,
    ) -> std::result::Result<Vec<Conversation>, StoreError>;
}

/// A human-curated exemplar exchange used as few-shot context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldenExample {
    pub id: String,
    pub user_message: String,
    pub assistant_message: String,
}

/// Read side of the curated example set — what the retrieval cache loads.
#[async_trait]
pub trait GoldenExampleStore: Send + Sync {
    /// All currently active examples, in curation order.
    async fn list_active(&self) -> std::result::Result<Vec<GoldenExample>, StoreError>;
}

/// Curation side — how administrators maintain the example set.
#[async_trait]
pub trait GoldenExampleCurator: Send + Sync {
    /// Add a new active example; returns it with an assigned id.
    async fn insert(
        &self,
        user_message: &str,
        assistant_message: &str,
    ) -> std::result::Result<GoldenExample, StoreError>;

    /// Deactivate an example so it no longer surfaces in retrieval.
    /// Returns false if the id is unknown.
    async fn deactivate(&self, id: &str) -> std::result::Result<bool, StoreError>;
}
