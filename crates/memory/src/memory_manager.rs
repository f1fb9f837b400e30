//! Memory manager implementations.
//!
//! The pipeline consumes long-term memory read-only; extraction lives
//! outside this service. [`KeywordMemoryManager`] is a naive keyword-match
//! implementation for single-node runs and tests; [`NoopMemoryManager`]
//! disables memory entirely.

use async_trait::async_trait;
use mindhaven_core::error::MemoryError;
use mindhaven_core::memory::MemoryManager;
use std::sync::Arc;
use tokio::sync::RwLock;

struct MemoryRecord {
    user_id: String,
    content: String,
}

/// Keyword-match memory manager over in-process records.
pub struct KeywordMemoryManager {
    records: Arc<RwLock<Vec<MemoryRecord>>>,
}

impl KeywordMemoryManager {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Store a memory entry for a user.
    pub async fn remember(&self, user_id: &str, content: &str) {
        self.records.write().await.push(MemoryRecord {
            user_id: user_id.into(),
            content: content.into(),
        });
    }
}

impl Default for KeywordMemoryManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Character bigrams, punctuation and whitespace dropped. Bigrams work for
/// unsegmented Chinese text where word tokens would be whole clauses.
fn bigrams(text: &str) -> std::collections::HashSet<String> {
    let chars: Vec<char> = text
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && !"，。！？、；：,.!?;:".contains(*c))
        .collect();
    chars
        .windows(2)
        .map(|w| w.iter().collect::<String>())
        .collect()
}

/// How many bigrams two texts must share to count as related.
const MIN_SHARED_BIGRAMS: usize = 2;

#[async_trait]
impl MemoryManager for KeywordMemoryManager {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn context_for(
        &self,
        user_id: &str,
        current_message: &str,
    ) -> Result<String, MemoryError> {
        let message_bigrams = bigrams(current_message);
        let records = self.records.read().await;

        let relevant: Vec<&str> = records
            .iter()
            .filter(|r| r.user_id == user_id)
            .filter(|r| {
                bigrams(&r.content)
                    .intersection(&message_bigrams)
                    .count()
                    >= MIN_SHARED_BIGRAMS
            })
            .map(|r| r.content.as_str())
            .collect();

        if relevant.is_empty() {
            return Ok(String::new());
        }

        let mut context = String::new();
        for (i, entry) in relevant.iter().enumerate() {
            context.push_str(&format!("{}. {}\n", i + 1, entry));
        }
        Ok(context.trim_end().to_string())
    }
}

/// A manager that always returns empty context.
pub struct NoopMemoryManager;

#[async_trait]
impl MemoryManager for NoopMemoryManager {
    fn name(&self) -> &str {
        "noop"
    }

    async fn context_for(&self, _user_id: &str, _message: &str) -> Result<String, MemoryError> {
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn matching_memories_returned_numbered() {
        let manager = KeywordMemoryManager::new();
        manager.remember("u1", "用户提到考试压力大").await;
        manager.remember("u1", "用户养了一只猫").await;

        let context = manager.context_for("u1", "考试压力又上来了").await.unwrap();
        assert!(context.contains("考试压力"));
        assert!(!context.contains("猫"));
        assert!(context.starts_with("1. "));
    }

    #[tokio::test]
    async fn memories_are_per_user() {
        let manager = KeywordMemoryManager::new();
        manager.remember("u1", "考试压力").await;

        let context = manager.context_for("u2", "考试压力").await.unwrap();
        assert!(context.is_empty());
    }

    #[tokio::test]
    async fn no_match_is_empty() {
        let manager = KeywordMemoryManager::new();
        manager.remember("u1", "养了一只猫").await;

        let context = manager.context_for("u1", "工作加班").await.unwrap();
        assert!(context.is_empty());
    }

    #[tokio::test]
    async fn noop_always_empty() {
        let manager = NoopMemoryManager;
        let context = manager.context_for("u1", "任何消息").await.unwrap();
        assert!(context.is_empty());
        assert_eq!(manager.name(), "noop");
    }
}
