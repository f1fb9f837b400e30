//! The golden-example cache.
//!
//! Owned value with constructor-injected store, TTL, and clock — no ambient
//! process globals. Refresh builds a fresh snapshot and swaps the `Arc`
//! reference; readers holding the old snapshot are unaffected, and a failed
//! refresh leaves the previous snapshot intact (stale-but-available).
//! Concurrent refreshes may redundantly fetch; last writer wins.

use crate::keywords::{coverage_score, extract_keywords};
use chrono::{DateTime, Duration, Utc};
use mindhaven_core::store::{GoldenExample, GoldenExampleStore};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Injected time source so tests can drive TTL expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// One cached example with its derived keyword set. The keyword set is used
/// only for scoring and never persisted.
struct CachedExample {
    example: GoldenExample,
    keywords: HashSet<String>,
}

/// An immutable cache generation.
struct Snapshot {
    fetched_at: DateTime<Utc>,
    entries: Vec<CachedExample>,
}

/// TTL'd cache of curated examples with keyword-overlap retrieval.
pub struct ExampleCache {
    store: Arc<dyn GoldenExampleStore>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    snapshot: RwLock<Option<Arc<Snapshot>>>,
}

impl ExampleCache {
    pub fn new(store: Arc<dyn GoldenExampleStore>, ttl_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            ttl: Duration::seconds(ttl_secs as i64),
            clock,
            snapshot: RwLock::new(None),
        }
    }

    /// Retrieve up to `top_k` examples for a query.
    ///
    /// - Zero extractable query keywords → the first `top_k` cached
    ///   examples in cache order.
    /// - Otherwise the `top_k` highest coverage scores among score > 0,
    ///   stable-sorted descending, ties broken by cache order. Returns
    ///   fewer than `top_k` when there aren't enough matches — never pads.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Vec<GoldenExample> {
        let Some(snapshot) = self.current_snapshot().await else {
            return Vec::new();
        };

        let query_keywords: HashSet<String> = extract_keywords(query).into_iter().collect();

        if query_keywords.is_empty() {
            return snapshot
                .entries
                .iter()
                .take(top_k)
                .map(|e| e.example.clone())
                .collect();
        }

        let mut scored: Vec<(f32, &CachedExample)> = snapshot
            .entries
            .iter()
            .map(|entry| (coverage_score(&query_keywords, &entry.keywords), entry))
            .filter(|(score, _)| *score > 0.0)
            .collect();

        // stable sort keeps cache order for equal scores
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        scored.into_iter().map(|(_, e)| e.example.clone()).collect()
    }

    /// Force a refresh regardless of TTL. Failures keep the old snapshot.
    pub async fn refresh(&self) -> bool {
        match self.store.list_active().await {
            Ok(examples) => {
                let snapshot = Arc::new(Self::build_snapshot(examples, self.clock.now()));
                debug!(count = snapshot.entries.len(), "Example cache refreshed");
                *self.snapshot.write().await = Some(snapshot);
                true
            }
            Err(e) => {
                warn!(error = %e, "Example cache refresh failed, keeping previous snapshot");
                false
            }
        }
    }

    /// The snapshot to read from, refreshing first when missing or older
    /// than the TTL.
    async fn current_snapshot(&self) -> Option<Arc<Snapshot>> {
        let now = self.clock.now();

        if let Some(snapshot) = self.snapshot.read().await.as_ref() {
            if now - snapshot.fetched_at < self.ttl {
                return Some(snapshot.clone());
            }
        }

        self.refresh().await;
        self.snapshot.read().await.clone()
    }

    fn build_snapshot(examples: Vec<GoldenExample>, fetched_at: DateTime<Utc>) -> Snapshot {
        let entries = examples
            .into_iter()
            .map(|example| {
                let keywords = extract_keywords(&example.user_message).into_iter().collect();
                CachedExample { example, keywords }
            })
            .collect();
        Snapshot {
            fetched_at,
            entries,
        }
    }
}
