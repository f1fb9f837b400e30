//! In-memory message store — conversations held in a Vec behind an RwLock.
//!
//! Message creation within one conversation is serialized by the write
//! lock, preserving arrival order.

use async_trait::async_trait;
use chrono::Utc;
use mindhaven_core::error::StoreError;
use mindhaven_core::message::{Conversation, Message};
use mindhaven_core::store::{MessageStore, NewMessage};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// An in-memory store that keeps conversations in a Vec.
pub struct InMemoryMessageStore {
    conversations: Arc<RwLock<Vec<Conversation>>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self {
            conversations: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for InMemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn create_conversation(&self, user_id: &str) -> Result<Conversation, StoreError> {
        let conversation = Conversation::new(user_id);
        self.conversations.write().await.push(conversation.clone());
        Ok(conversation)
    }

    async fn create_message(&self, new: NewMessage) -> Result<Message, StoreError> {
        let mut conversations = self.conversations.write().await;
        let conversation = conversations
            .iter_mut()
            .find(|c| c.id.0 == new.conversation_id)
            .ok_or_else(|| StoreError::NotFound(format!("conversation {}", new.conversation_id)))?;

        let message = Message {
            id: Uuid::new_v4().to_string(),
            role: new.role,
            content: new.content,
            metadata: new.metadata,
            created_at: Utc::now(),
        };
        conversation.push(message.clone());
        Ok(message)
    }

    async fn update_conversation_title(
        &self,
        conversation_id: &str,
        title: &str,
    ) -> Result<(), StoreError> {
        let mut conversations = self.conversations.write().await;
        let conversation = conversations
            .iter_mut()
            .find(|c| c.id.0 == conversation_id)
            .ok_or_else(|| StoreError::NotFound(format!("conversation {conversation_id}")))?;
        conversation.title = Some(title.to_string());
        Ok(())
    }

    async fn get_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Option<Conversation>, StoreError> {
        let conversations = self.conversations.read().await;
        Ok(conversations
            .iter()
            .find(|c| c.id.0 == conversation_id)
            .cloned())
    }

    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>, StoreError> {
        let conversations = self.conversations.read().await;
        let mut result: Vec<Conversation> = conversations
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindhaven_core::message::Role;

    fn new_message(conversation_id: &str, role: Role, content: &str) -> NewMessage {
        NewMessage {
            conversation_id: conversation_id.into(),
            role,
            content: content.into(),
            metadata: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn create_and_fetch_conversation() {
        let store = InMemoryMessageStore::new();
        let conv = store.create_conversation("user-1").await.unwrap();

        let fetched = store.get_conversation(&conv.id.0).await.unwrap().unwrap();
        assert_eq!(fetched.user_id, "user-1");
        assert!(fetched.messages.is_empty());
        assert!(fetched.title.is_none());
    }

    #[tokio::test]
    async fn messages_kept_in_arrival_order() {
        let store = InMemoryMessageStore::new();
        let conv = store.create_conversation("user-1").await.unwrap();

        store
            .create_message(new_message(&conv.id.0, Role::User, "第一条"))
            .await
            .unwrap();
        store
            .create_message(new_message(&conv.id.0, Role::Assistant, "第二条"))
            .await
            .unwrap();

        let fetched = store.get_conversation(&conv.id.0).await.unwrap().unwrap();
        assert_eq!(fetched.messages.len(), 2);
        assert_eq!(fetched.messages[0].content, "第一条");
        assert_eq!(fetched.messages[1].content, "第二条");
    }

    #[tokio::test]
    async fn message_to_unknown_conversation_fails() {
        let store = InMemoryMessageStore::new();
        let result = store
            .create_message(new_message("missing", Role::User, "hi"))
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn title_update() {
        let store = InMemoryMessageStore::new();
        let conv = store.create_conversation("user-1").await.unwrap();

        store
            .update_conversation_title(&conv.id.0, "失眠求助")
            .await
            .unwrap();
        let fetched = store.get_conversation(&conv.id.0).await.unwrap().unwrap();
        assert_eq!(fetched.title.as_deref(), Some("失眠求助"));
    }

    #[tokio::test]
    async fn list_filters_by_user() {
        let store = InMemoryMessageStore::new();
        store.create_conversation("user-1").await.unwrap();
        store.create_conversation("user-2").await.unwrap();
        store.create_conversation("user-1").await.unwrap();

        let list = store.list_conversations("user-1").await.unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.iter().all(|c| c.user_id == "user-1"));
    }

    #[tokio::test]
    async fn metadata_persisted_with_message() {
        let store = InMemoryMessageStore::new();
        let conv = store.create_conversation("user-1").await.unwrap();

        let mut metadata = serde_json::Map::new();
        metadata.insert("route".into(), serde_json::json!("crisis"));
        store
            .create_message(NewMessage {
                conversation_id: conv.id.0.clone(),
                role: Role::Assistant,
                content: "回应".into(),
                metadata,
            })
            .await
            .unwrap();

        let fetched = store.get_conversation(&conv.id.0).await.unwrap().unwrap();
        assert_eq!(fetched.messages[0].metadata["route"], "crisis");
    }
}
