//! In-memory golden-example store with an active flag for curation.

use async_trait::async_trait;
use mindhaven_core::error::StoreError;
use mindhaven_core::store::{GoldenExample, GoldenExampleCurator, GoldenExampleStore};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

struct Row {
    example: GoldenExample,
    active: bool,
}

/// Curated examples held in memory, in curation order.
pub struct InMemoryExampleStore {
    rows: Arc<RwLock<Vec<Row>>>,
}

impl InMemoryExampleStore {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Seed with preset examples (all active). Used at startup and in tests.
    pub async fn seed(&self, examples: Vec<(String, String)>) {
        let mut rows = self.rows.write().await;
        for (user_message, assistant_message) in examples {
            rows.push(Row {
                example: GoldenExample {
                    id: Uuid::new_v4().to_string(),
                    user_message,
                    assistant_message,
                },
                active: true,
            });
        }
    }
}

impl Default for InMemoryExampleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GoldenExampleStore for InMemoryExampleStore {
    async fn list_active(&self) -> Result<Vec<GoldenExample>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|r| r.active)
            .map(|r| r.example.clone())
            .collect())
    }
}

#[async_trait]
impl GoldenExampleCurator for InMemoryExampleStore {
    async fn insert(
        &self,
        user_message: &str,
        assistant_message: &str,
    ) -> Result<GoldenExample, StoreError> {
        let example = GoldenExample {
            id: Uuid::new_v4().to_string(),
            user_message: user_message.into(),
            assistant_message: assistant_message.into(),
        };
        self.rows.write().await.push(Row {
            example: example.clone(),
            active: true,
        });
        Ok(example)
    }

    async fn deactivate(&self, id: &str) -> Result<bool, StoreError> {
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|r| r.example.id == id) {
            Some(row) => {
                row.active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
