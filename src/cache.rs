// Bounded in-memory store of completed analyses

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::DEFAULT_CACHE_CAPACITY;
use crate::models::AnalysisResult;

/// Keyed by analysis id. Once the size passes `capacity` the entry with the
/// smallest key is evicted; ids are time-ordered UUIDv7 strings, so that is the
/// oldest insertion.
#[derive(Clone)]
pub struct ResultCache {
    inner: Arc<RwLock<BTreeMap<String, AnalysisResult>>>,
    capacity: usize,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(BTreeMap::new())),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert and evict under one write lock; returns the evicted id, if any
    pub async fn insert(&self, result: AnalysisResult) -> Option<String> {
        let mut guard = self.inner.write().await;
        guard.insert(result.analysis_id.clone(), result);

        if guard.len() > self.capacity {
            if let Some((evicted, _)) = guard.pop_first() {
                debug!(analysis_id = %evicted, "Evicted cached result");
                return Some(evicted);
            }
        }
        None
    }

    pub async fn get(&self, analysis_id: &str) -> Option<AnalysisResult> {
        let guard = self.inner.read().await;
        guard.get(analysis_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }
}
