//! Single-slot persistence for the in-progress authoring session.
//!
//! The store never surfaces storage failures: an unavailable or corrupt
//! backing store degrades to "no draft available" and the authoring flow keeps
//! working without persistence.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use shared::domain::{DraftInput, DraftRecord};
use storage::KeyValueStore;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};

pub const DRAFT_STORAGE_KEY: &str = "blog_draft";
pub const DEFAULT_DRAFT_TTL_DAYS: i64 = 7;

enum SlotState {
    Empty,
    Valid(DraftRecord),
    Malformed(String),
    Expired(DraftRecord),
}

pub struct DraftStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    key: String,
    ttl: Duration,
}

impl DraftStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            key: DRAFT_STORAGE_KEY.to_string(),
            ttl: Duration::days(DEFAULT_DRAFT_TTL_DAYS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Stamps the draft with the current time and replaces whatever the slot held.
    pub async fn save(&self, draft: DraftInput) {
        let record = DraftRecord::stamp(draft, self.clock.now());
        let serialized = match serde_json::to_string(&record) {
            Ok(serialized) => serialized,
            Err(err) => {
                warn!(key = %self.key, "draft: failed to serialize draft: {err}");
                return;
            }
        };

        match self.store.set(&self.key, &serialized).await {
            Ok(()) => debug!(
                key = %self.key,
                mode = ?record.mode,
                timestamp = %record.timestamp,
                "draft: saved"
            ),
            Err(err) => warn!(key = %self.key, "draft: save failed, keeping prior state: {err:#}"),
        }
    }

    /// Returns the stored draft if it is well-formed and not expired. Stale or
    /// malformed records are purged as a side effect.
    pub async fn load(&self) -> Option<DraftRecord> {
        match self.read_slot().await {
            SlotState::Empty => None,
            SlotState::Valid(record) => Some(record),
            SlotState::Malformed(reason) => {
                warn!(key = %self.key, "draft: discarding malformed draft: {reason}");
                self.purge().await;
                None
            }
            SlotState::Expired(record) => {
                info!(
                    key = %self.key,
                    timestamp = %record.timestamp,
                    "draft: discarding expired draft"
                );
                self.purge().await;
                None
            }
        }
    }

    pub async fn clear(&self) {
        if let Err(err) = self.store.delete(&self.key).await {
            warn!(key = %self.key, "draft: clear failed: {err:#}");
        }
    }

    /// Whether a valid draft exists. Never mutates the slot.
    pub async fn peek_validity(&self) -> bool {
        matches!(self.read_slot().await, SlotState::Valid(_))
    }

    pub fn is_fresh(&self, timestamp: DateTime<Utc>) -> bool {
        self.clock.now().signed_duration_since(timestamp) <= self.ttl
    }

    async fn read_slot(&self) -> SlotState {
        let raw = match self.store.get(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return SlotState::Empty,
            Err(err) => {
                warn!(key = %self.key, "draft: storage unavailable, treating as empty: {err:#}");
                return SlotState::Empty;
            }
        };

        match serde_json::from_str::<DraftRecord>(&raw) {
            Ok(record) if self.is_fresh(record.timestamp) => SlotState::Valid(record),
            Ok(record) => SlotState::Expired(record),
            Err(err) => SlotState::Malformed(err.to_string()),
        }
    }

    async fn purge(&self) {
        if let Err(err) = self.store.delete(&self.key).await {
            warn!(key = %self.key, "draft: failed to purge stale draft: {err:#}");
        }
    }
}

#[cfg(test)]
#[path = "tests/draft_store_tests.rs"]
mod tests;
