//! Fakes shared by the controller and draft store test suites.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{
    domain::{ContentId, PromptAnalysis},
    protocol::{
        AnalyzePromptRequest, ApplyReviewRequest, ContentReference, GenerateBlogRequest,
        GenerationResult, ReviewRequest, ReviewResult, VersionRestoreOutcome,
    },
};
use tokio::sync::{mpsc, oneshot};

use crate::{
    api::AuthoringApi,
    cache::{CacheInvalidator, CacheKey},
    clock::Clock,
    error::RemoteError,
    notifier::{Notification, Notifier, Severity},
};

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn starting_at_epoch_millis(millis: i64) -> Self {
        Self::new(DateTime::from_timestamp_millis(millis).expect("timestamp"))
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock lock");
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock")
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn all(&self) -> Vec<Notification> {
        self.notifications.lock().expect("notifier lock").clone()
    }

    pub fn with_severity(&self, severity: Severity) -> Vec<Notification> {
        self.all()
            .into_iter()
            .filter(|n| n.severity == severity)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.notifications
            .lock()
            .expect("notifier lock")
            .push(notification);
    }
}

#[derive(Default)]
pub struct RecordingInvalidator {
    keys: Mutex<Vec<CacheKey>>,
}

impl RecordingInvalidator {
    pub fn keys(&self) -> Vec<CacheKey> {
        self.keys.lock().expect("invalidator lock").clone()
    }
}

impl CacheInvalidator for RecordingInvalidator {
    fn invalidate(&self, key: &CacheKey) {
        self.keys.lock().expect("invalidator lock").push(key.clone());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallKind {
    Analyze(String),
    Generate {
        prompt: String,
        analysis: Option<PromptAnalysis>,
    },
    Review(ReviewRequest),
    ApplyReview(ContentId),
    RestoreVersion(ContentId, u32),
}

/// A remote call waiting for the test to decide its outcome.
pub struct PendingCall {
    pub kind: CallKind,
    respond: oneshot::Sender<Result<Value, RemoteError>>,
}

impl PendingCall {
    pub fn succeed(self, value: Value) {
        let _ = self.respond.send(Ok(value));
    }

    pub fn fail(self, err: RemoteError) {
        let _ = self.respond.send(Err(err));
    }
}

/// `AuthoringApi` whose responses are released by the test, in any order.
pub struct ScriptedApi {
    calls: mpsc::UnboundedSender<PendingCall>,
    issued: AtomicUsize,
}

impl ScriptedApi {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PendingCall>) {
        let (calls, rx) = mpsc::unbounded_channel();
        (
            Self {
                calls,
                issued: AtomicUsize::new(0),
            },
            rx,
        )
    }

    pub fn issued(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }

    async fn call<T: DeserializeOwned>(&self, kind: CallKind) -> Result<T, RemoteError> {
        self.issued.fetch_add(1, Ordering::SeqCst);
        let (respond, rx) = oneshot::channel();
        self.calls
            .send(PendingCall { kind, respond })
            .map_err(|_| RemoteError::Decode("test harness gone".to_string()))?;
        let value = rx
            .await
            .map_err(|_| RemoteError::Decode("response never released".to_string()))??;
        serde_json::from_value(value).map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

#[async_trait]
impl AuthoringApi for ScriptedApi {
    async fn analyze_prompt(
        &self,
        request: AnalyzePromptRequest,
    ) -> Result<PromptAnalysis, RemoteError> {
        self.call(CallKind::Analyze(request.prompt)).await
    }

    async fn generate_blog(
        &self,
        request: GenerateBlogRequest,
    ) -> Result<GenerationResult, RemoteError> {
        self.call(CallKind::Generate {
            prompt: request.prompt,
            analysis: request.analysis,
        })
        .await
    }

    async fn review(&self, request: ReviewRequest) -> Result<ReviewResult, RemoteError> {
        self.call(CallKind::Review(request)).await
    }

    async fn apply_review(
        &self,
        content_id: &ContentId,
        _request: ApplyReviewRequest,
    ) -> Result<ContentReference, RemoteError> {
        self.call(CallKind::ApplyReview(content_id.clone())).await
    }

    async fn restore_version(
        &self,
        content_id: &ContentId,
        version: u32,
    ) -> Result<VersionRestoreOutcome, RemoteError> {
        self.call(CallKind::RestoreVersion(content_id.clone(), version))
            .await
    }
}

pub async fn next_call(rx: &mut mpsc::UnboundedReceiver<PendingCall>) -> PendingCall {
    tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
        .await
        .expect("remote call issued in time")
        .expect("api alive")
}
