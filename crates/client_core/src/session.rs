use std::{sync::Arc, time::Duration};

use shared::domain::{DraftInput, DraftRecord};
use tokio::sync::watch;
use tracing::info;

use crate::{
    autosave::DraftAutosaver, draft_store::DraftStore, generation::GenerationController,
    review::ReviewController,
};

/// One authoring session: the draft slot plus the controllers acting on it.
pub struct AuthoringSession {
    drafts: Arc<DraftStore>,
    generation: Arc<GenerationController>,
    review: Arc<ReviewController>,
}

impl AuthoringSession {
    pub fn new(
        drafts: Arc<DraftStore>,
        generation: Arc<GenerationController>,
        review: Arc<ReviewController>,
    ) -> Self {
        Self {
            drafts,
            generation,
            review,
        }
    }

    pub fn drafts(&self) -> &Arc<DraftStore> {
        &self.drafts
    }

    pub fn generation(&self) -> &Arc<GenerationController> {
        &self.generation
    }

    pub fn review(&self) -> &Arc<ReviewController> {
        &self.review
    }

    /// Returns the unexpired draft left by a previous session, if any.
    pub async fn resume(&self) -> Option<DraftRecord> {
        let draft = self.drafts.load().await;
        if let Some(record) = &draft {
            info!(
                mode = ?record.mode,
                saved_at = %record.timestamp,
                "session: resuming saved draft"
            );
        }
        draft
    }

    pub async fn checkpoint(&self, draft: DraftInput) {
        self.drafts.save(draft).await;
    }

    pub fn autosave(
        &self,
        updates: watch::Receiver<DraftInput>,
        interval: Duration,
    ) -> DraftAutosaver {
        DraftAutosaver::spawn(self.drafts.clone(), updates, interval)
    }

    /// Ends the session after the content was published or discarded.
    pub async fn end(&self) {
        self.generation.cancel_all();
        self.drafts.clear().await;
        info!("session: ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cache::NoopInvalidator,
        test_support::{next_call, RecordingNotifier, ScriptedApi},
    };
    use shared::domain::AuthoringMode;
    use storage::MemoryStore;

    fn session() -> (
        AuthoringSession,
        tokio::sync::mpsc::UnboundedReceiver<crate::test_support::PendingCall>,
    ) {
        let (api, rx) = ScriptedApi::new();
        let api = Arc::new(api);
        let notifier = Arc::new(RecordingNotifier::default());
        let session = AuthoringSession::new(
            Arc::new(DraftStore::new(Arc::new(MemoryStore::new()))),
            Arc::new(GenerationController::new(api.clone(), notifier.clone())),
            Arc::new(ReviewController::new(
                api,
                notifier,
                Arc::new(NoopInvalidator),
            )),
        );
        (session, rx)
    }

    #[tokio::test]
    async fn resume_returns_checkpointed_draft() {
        let (session, _rx) = session();
        assert!(session.resume().await.is_none());

        let draft = DraftInput {
            mode: AuthoringMode::AiGenerate,
            prompt: "cats".to_string(),
            ..DraftInput::default()
        };
        session.checkpoint(draft.clone()).await;

        let resumed = session.resume().await.expect("draft");
        assert_eq!(resumed.into_input(), draft);
    }

    #[tokio::test]
    async fn end_clears_draft_and_cancels_in_flight_generation() {
        let (session, mut rx) = session();
        session
            .checkpoint(DraftInput {
                prompt: "cats".to_string(),
                ..DraftInput::default()
            })
            .await;

        let generation = Arc::clone(session.generation());
        let task = tokio::spawn(async move { generation.generate_blog("cats", None).await });
        let _call = next_call(&mut rx).await;
        assert!(session.generation().is_generating());

        session.end().await;

        assert!(task.await.expect("join").expect_err("cancelled").is_cancelled());
        assert!(!session.generation().is_generating());
        assert!(session.resume().await.is_none());
    }
}
