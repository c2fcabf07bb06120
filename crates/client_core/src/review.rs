use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use shared::{
    domain::{ContentId, ReviewPayload},
    protocol::{
        ApplyReviewRequest, ContentReference, ReviewRequest, ReviewResult, VersionRestoreOutcome,
    },
};
use tracing::{info, warn};

use crate::{
    api::AuthoringApi,
    cache::{CacheInvalidator, CacheKey},
    error::{ClientError, RemoteError},
    notifier::{Notification, Notifier},
};

const REVIEW_FAILED: &str = "Failed to review content";
const APPLY_FAILED: &str = "Failed to apply review";
const RESTORE_FAILED: &str = "Failed to restore version";

#[derive(Debug, Clone, PartialEq)]
pub struct OperationStatus<T> {
    pub is_pending: bool,
    pub result: Option<T>,
    pub error: Option<String>,
}

struct OperationSlot<T> {
    in_flight: usize,
    result: Option<T>,
    error: Option<String>,
}

impl<T> Default for OperationSlot<T> {
    fn default() -> Self {
        Self {
            in_flight: 0,
            result: None,
            error: None,
        }
    }
}

/// Keeps the pending count right even if the caller drops the operation.
struct InFlight<'a, T> {
    slot: &'a Mutex<OperationSlot<T>>,
}

impl<'a, T> InFlight<'a, T> {
    fn enter(slot: &'a Mutex<OperationSlot<T>>) -> Self {
        let mut guard = lock(slot);
        guard.in_flight += 1;
        guard.error = None;
        Self { slot }
    }
}

impl<T> Drop for InFlight<'_, T> {
    fn drop(&mut self) {
        let mut guard = lock(self.slot);
        guard.in_flight = guard.in_flight.saturating_sub(1);
    }
}

fn lock<T>(slot: &Mutex<OperationSlot<T>>) -> MutexGuard<'_, OperationSlot<T>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Review, apply-review and restore-version mutations on persisted content.
///
/// Operations are independent: concurrent calls are neither deduplicated nor
/// cancelled, since each may target a different content item.
pub struct ReviewController {
    api: Arc<dyn AuthoringApi>,
    notifier: Arc<dyn Notifier>,
    cache: Arc<dyn CacheInvalidator>,
    review: Mutex<OperationSlot<ReviewResult>>,
    apply: Mutex<OperationSlot<ContentReference>>,
    restore: Mutex<OperationSlot<VersionRestoreOutcome>>,
}

impl ReviewController {
    pub fn new(
        api: Arc<dyn AuthoringApi>,
        notifier: Arc<dyn Notifier>,
        cache: Arc<dyn CacheInvalidator>,
    ) -> Self {
        Self {
            api,
            notifier,
            cache,
            review: Mutex::default(),
            apply: Mutex::default(),
            restore: Mutex::default(),
        }
    }

    /// Requests an AI review of a stored item, or of an ad hoc payload when
    /// nothing has been persisted yet.
    pub async fn review(
        &self,
        content_id: Option<ContentId>,
        payload: Option<ReviewPayload>,
    ) -> Result<ReviewResult, ClientError> {
        if content_id.is_none() && payload.is_none() {
            return Err(ClientError::Validation(
                "a content id or a payload is required to request a review".to_string(),
            ));
        }

        let request = ReviewRequest {
            content_id: content_id.clone(),
            payload,
        };
        let result = self
            .track(&self.review, REVIEW_FAILED, self.api.review(request))
            .await?;

        info!(
            content_id = content_id.as_ref().map(ContentId::as_str),
            suggestions = result.suggestions.len(),
            "review: review completed"
        );
        if let Some(content_id) = content_id {
            self.cache.invalidate(&CacheKey::Reviews(content_id));
        }
        Ok(result)
    }

    pub async fn apply_review(
        &self,
        content_id: Option<ContentId>,
        payload: ReviewPayload,
    ) -> Result<ContentReference, ClientError> {
        let Some(content_id) = content_id else {
            return Err(ClientError::Validation(
                "a content id is required to apply a review".to_string(),
            ));
        };

        let reference = self
            .track(
                &self.apply,
                APPLY_FAILED,
                self.api.apply_review(&content_id, ApplyReviewRequest { payload }),
            )
            .await?;

        info!(content_id = %content_id, "review: review applied");
        self.notifier.notify(Notification::success(
            "Review applied",
            "The suggested changes were applied.",
        ));
        Ok(reference)
    }

    pub async fn restore_version(
        &self,
        content_id: &ContentId,
        version: u32,
    ) -> Result<VersionRestoreOutcome, ClientError> {
        let outcome = self
            .track(
                &self.restore,
                RESTORE_FAILED,
                self.api.restore_version(content_id, version),
            )
            .await?;

        info!(content_id = %content_id, version, "review: version restored");
        self.cache.invalidate(&CacheKey::Content(content_id.clone()));
        self.cache.invalidate(&CacheKey::Versions(content_id.clone()));
        self.cache.invalidate(&CacheKey::ContentList);
        self.notifier.notify(Notification::success(
            "Version restored",
            format!("Restored version {version}."),
        ));
        Ok(outcome)
    }

    pub fn is_reviewing(&self) -> bool {
        lock(&self.review).in_flight > 0
    }

    pub fn is_applying(&self) -> bool {
        lock(&self.apply).in_flight > 0
    }

    pub fn is_restoring(&self) -> bool {
        lock(&self.restore).in_flight > 0
    }

    pub fn review_status(&self) -> OperationStatus<ReviewResult> {
        status(&self.review)
    }

    pub fn apply_status(&self) -> OperationStatus<ContentReference> {
        status(&self.apply)
    }

    pub fn restore_status(&self) -> OperationStatus<VersionRestoreOutcome> {
        status(&self.restore)
    }

    async fn track<T, Fut>(
        &self,
        slot: &Mutex<OperationSlot<T>>,
        generic_failure: &str,
        call: Fut,
    ) -> Result<T, ClientError>
    where
        T: Clone,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let in_flight = InFlight::enter(slot);
        let outcome = call.await.map_err(ClientError::from);

        let message = {
            let mut guard = lock(slot);
            match &outcome {
                Ok(value) => {
                    guard.result = Some(value.clone());
                    None
                }
                Err(err) => {
                    let message = err.user_message(generic_failure);
                    guard.error = Some(message.clone());
                    Some(message)
                }
            }
        };
        drop(in_flight);

        if let (Some(message), Err(err)) = (message, &outcome) {
            warn!("review: {generic_failure}: {err}");
            self.notifier.notify(Notification::error(generic_failure, message));
        }
        outcome
    }
}

fn status<T: Clone>(slot: &Mutex<OperationSlot<T>>) -> OperationStatus<T> {
    let guard = lock(slot);
    OperationStatus {
        is_pending: guard.in_flight > 0,
        result: guard.result.clone(),
        error: guard.error.clone(),
    }
}

#[cfg(test)]
#[path = "tests/review_tests.rs"]
mod tests;
