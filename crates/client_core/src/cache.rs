use std::{
    collections::HashSet,
    sync::{Mutex, PoisonError},
};

use shared::domain::ContentId;

/// Locally cached views that depend on remote content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Content(ContentId),
    Versions(ContentId),
    Reviews(ContentId),
    ContentList,
}

pub trait CacheInvalidator: Send + Sync {
    fn invalidate(&self, key: &CacheKey);
}

pub struct NoopInvalidator;

impl CacheInvalidator for NoopInvalidator {
    fn invalidate(&self, _key: &CacheKey) {}
}

/// Records which views went stale so the view layer can refetch them.
#[derive(Default)]
pub struct ViewCache {
    stale: Mutex<HashSet<CacheKey>>,
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_stale(&self, key: &CacheKey) -> bool {
        self.stale
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    /// Returns and forgets every key invalidated since the last drain.
    pub fn drain_stale(&self) -> Vec<CacheKey> {
        self.stale
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect()
    }
}

impl CacheInvalidator for ViewCache {
    fn invalidate(&self, key: &CacheKey) {
        self.stale
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone());
    }
}
