//! Prompt analysis and content generation against the AI service.
//!
//! Each operation runs on its own cancellation channel. Issuing an operation
//! supersedes the previous one on that channel, and a superseded operation
//! never touches controller state or raises a notification: the visible
//! result always belongs to the last issued request, not the last to arrive.

use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use shared::{
    domain::PromptAnalysis,
    protocol::{AnalyzePromptRequest, GenerateBlogRequest, GenerationResult},
};
use tracing::{debug, info, warn};

use crate::{
    api::AuthoringApi,
    cancellation::{CancellationCoordinator, Channel, OperationToken},
    error::{ClientError, RemoteError},
    notifier::{Notification, Notifier},
};

const ANALYZE_FAILED: &str = "Failed to analyze prompt";
const GENERATE_FAILED: &str = "Failed to generate blog content";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationSnapshot {
    pub is_analyzing: bool,
    pub is_generating: bool,
    pub analysis_result: Option<PromptAnalysis>,
    pub generation_result: Option<GenerationResult>,
    pub analysis_error: Option<String>,
    pub generation_error: Option<String>,
}

#[derive(Default)]
struct GenerationState {
    analysis_result: Option<PromptAnalysis>,
    generation_result: Option<GenerationResult>,
    analysis_error: Option<String>,
    generation_error: Option<String>,
    last_channel: Option<Channel>,
}

impl GenerationState {
    fn error_slot(&mut self, channel: Channel) -> &mut Option<String> {
        match channel {
            Channel::Analyze => &mut self.analysis_error,
            Channel::Generate => &mut self.generation_error,
        }
    }
}

/// Unregisters an attempt whose caller dropped it before it settled. A token
/// that was already completed or superseded is left alone.
struct Attempt<'a> {
    coordinator: &'a CancellationCoordinator,
    token: OperationToken,
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        self.coordinator.complete(&self.token);
    }
}

pub struct GenerationController {
    api: Arc<dyn AuthoringApi>,
    notifier: Arc<dyn Notifier>,
    coordinator: CancellationCoordinator,
    state: Mutex<GenerationState>,
}

impl GenerationController {
    pub fn new(api: Arc<dyn AuthoringApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            notifier,
            coordinator: CancellationCoordinator::new(),
            state: Mutex::new(GenerationState::default()),
        }
    }

    pub async fn analyze_prompt(&self, prompt: &str) -> Result<PromptAnalysis, ClientError> {
        let request = AnalyzePromptRequest {
            prompt: prompt.to_string(),
        };
        let analysis = self
            .run(
                Channel::Analyze,
                ANALYZE_FAILED,
                |state, analysis| state.analysis_result = Some(analysis),
                || self.api.analyze_prompt(request),
            )
            .await?;
        self.notifier.notify(Notification::success(
            "Prompt analyzed",
            "The prompt analysis is ready.",
        ));
        Ok(analysis)
    }

    pub async fn generate_blog(
        &self,
        prompt: &str,
        analysis: Option<PromptAnalysis>,
    ) -> Result<GenerationResult, ClientError> {
        let request = GenerateBlogRequest {
            prompt: prompt.to_string(),
            analysis,
        };
        let result = self
            .run(
                Channel::Generate,
                GENERATE_FAILED,
                |state, result| state.generation_result = Some(result),
                || self.api.generate_blog(request),
            )
            .await?;
        self.notifier.notify(Notification::success(
            "Content generated",
            "Your blog post has been generated.",
        ));
        Ok(result)
    }

    /// Cancels the channel used most recently. A no-op when nothing is in flight.
    pub fn cancel_request(&self) {
        let last_channel = self.lock_state().last_channel;
        if let Some(channel) = last_channel {
            self.coordinator.cancel(channel);
        }
    }

    pub fn cancel_all(&self) {
        self.coordinator.cancel_all();
    }

    pub fn is_analyzing(&self) -> bool {
        self.coordinator.is_active(Channel::Analyze)
    }

    pub fn is_generating(&self) -> bool {
        self.coordinator.is_active(Channel::Generate)
    }

    pub fn analysis_result(&self) -> Option<PromptAnalysis> {
        self.lock_state().analysis_result.clone()
    }

    pub fn generation_result(&self) -> Option<GenerationResult> {
        self.lock_state().generation_result.clone()
    }

    pub fn snapshot(&self) -> GenerationSnapshot {
        let state = self.lock_state();
        GenerationSnapshot {
            is_analyzing: self.is_analyzing(),
            is_generating: self.is_generating(),
            analysis_result: state.analysis_result.clone(),
            generation_result: state.generation_result.clone(),
            analysis_error: state.analysis_error.clone(),
            generation_error: state.generation_error.clone(),
        }
    }

    async fn run<T, F, Fut>(
        &self,
        channel: Channel,
        generic_failure: &str,
        apply: impl FnOnce(&mut GenerationState, T),
        call: F,
    ) -> Result<T, ClientError>
    where
        T: Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let attempt = Attempt {
            coordinator: &self.coordinator,
            token: self.begin(channel),
        };
        let token = &attempt.token;
        info!(channel = channel.as_str(), attempt = %token.id(), "generation: request issued");

        let outcome = token.run(call()).await;

        let mut state = self.lock_state();
        // Completion is decided under the state lock so a newer request can
        // never observe this one's result landing after its own.
        if outcome.as_ref().is_err_and(ClientError::is_cancelled)
            || !self.coordinator.complete(token)
        {
            debug!(
                channel = channel.as_str(),
                attempt = %token.id(),
                "generation: discarding outcome of superseded request"
            );
            return Err(ClientError::Cancelled);
        }

        match outcome {
            Ok(value) => {
                info!(
                    channel = channel.as_str(),
                    attempt = %token.id(),
                    "generation: request succeeded"
                );
                apply(&mut state, value.clone());
                Ok(value)
            }
            Err(err) => {
                let message = err.user_message(generic_failure);
                warn!(
                    channel = channel.as_str(),
                    attempt = %token.id(),
                    "generation: request failed: {err}"
                );
                *state.error_slot(channel) = Some(message.clone());
                drop(state);
                self.notifier.notify(Notification::error(generic_failure, message));
                Err(err)
            }
        }
    }

    fn begin(&self, channel: Channel) -> OperationToken {
        let mut state = self.lock_state();
        let token = self.coordinator.begin(channel);
        state.last_channel = Some(channel);
        *state.error_slot(channel) = None;
        token
    }

    fn lock_state(&self) -> MutexGuard<'_, GenerationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "tests/generation_tests.rs"]
mod tests;
