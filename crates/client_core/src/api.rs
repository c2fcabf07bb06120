//! Remote AI analysis/generation and review/versioning services.

use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use shared::{
    domain::{ContentId, PromptAnalysis},
    error::{ApiError, ErrorCode},
    protocol::{
        AnalyzePromptRequest, AnalyzePromptResponse, ApplyReviewRequest, ContentReference,
        GenerateBlogRequest, GenerationResult, ReviewRequest, ReviewResult,
        VersionRestoreOutcome,
    },
};
use tracing::debug;
use url::Url;

use crate::error::RemoteError;

#[async_trait]
pub trait AuthoringApi: Send + Sync {
    async fn analyze_prompt(
        &self,
        request: AnalyzePromptRequest,
    ) -> Result<PromptAnalysis, RemoteError>;
    async fn generate_blog(
        &self,
        request: GenerateBlogRequest,
    ) -> Result<GenerationResult, RemoteError>;
    async fn review(&self, request: ReviewRequest) -> Result<ReviewResult, RemoteError>;
    async fn apply_review(
        &self,
        content_id: &ContentId,
        request: ApplyReviewRequest,
    ) -> Result<ContentReference, RemoteError>;
    async fn restore_version(
        &self,
        content_id: &ContentId,
        version: u32,
    ) -> Result<VersionRestoreOutcome, RemoteError>;
}

#[derive(Debug, Clone, Default)]
pub struct HttpApiOptions {
    pub bearer_token: Option<String>,
    pub timeout: Option<Duration>,
}

pub struct HttpAuthoringApi {
    http: Client,
    base_url: Url,
    bearer_token: Option<String>,
}

impl HttpAuthoringApi {
    pub fn new(base_url: &str, options: HttpApiOptions) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url.trim())
            .with_context(|| format!("invalid authoring service url '{base_url}'"))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!(
                "authoring service url '{base_url}' cannot carry a path"
            ));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .context("failed to build authoring http client")?;

        Ok(Self {
            http,
            base_url,
            bearer_token: options.bearer_token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // `new` rejects cannot-be-a-base urls, so this always succeeds.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn post<B, T>(&self, url: Url, body: Option<&B>) -> Result<T, RemoteError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        debug!(url = %url, "api: POST");
        let mut request = self.http.post(url);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            return Err(error_from_body(status, &bytes));
        }

        serde_json::from_slice(&bytes).map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

/// Reads the service's `ApiError` body, falling back to a loose `{code?, message}`
/// or `{error}` shape. Unknown codes and non-JSON bodies still produce a
/// status-only error.
fn error_from_body(status: StatusCode, body: &[u8]) -> RemoteError {
    if let Ok(api_error) = serde_json::from_slice::<ApiError>(body) {
        return RemoteError::Server {
            status: status.as_u16(),
            code: Some(api_error.code),
            message: Some(api_error.message),
        };
    }

    let envelope = serde_json::from_slice::<Value>(body).unwrap_or(Value::Null);
    let code = envelope
        .get("code")
        .and_then(|code| ErrorCode::deserialize(code).ok());
    let message = ["message", "error"]
        .iter()
        .find_map(|field| envelope.get(*field).and_then(Value::as_str))
        .map(str::to_string);
    RemoteError::Server {
        status: status.as_u16(),
        code,
        message,
    }
}

#[async_trait]
impl AuthoringApi for HttpAuthoringApi {
    async fn analyze_prompt(
        &self,
        request: AnalyzePromptRequest,
    ) -> Result<PromptAnalysis, RemoteError> {
        let response: AnalyzePromptResponse = self
            .post(self.endpoint(&["ai", "analyze-prompt"]), Some(&request))
            .await?;
        Ok(response.analysis)
    }

    async fn generate_blog(
        &self,
        request: GenerateBlogRequest,
    ) -> Result<GenerationResult, RemoteError> {
        self.post(self.endpoint(&["ai", "generate-blog"]), Some(&request))
            .await
    }

    async fn review(&self, request: ReviewRequest) -> Result<ReviewResult, RemoteError> {
        self.post(self.endpoint(&["blogs", "review"]), Some(&request))
            .await
    }

    async fn apply_review(
        &self,
        content_id: &ContentId,
        request: ApplyReviewRequest,
    ) -> Result<ContentReference, RemoteError> {
        self.post(
            self.endpoint(&["blogs", content_id.as_str(), "apply-review"]),
            Some(&request),
        )
        .await
    }

    async fn restore_version(
        &self,
        content_id: &ContentId,
        version: u32,
    ) -> Result<VersionRestoreOutcome, RemoteError> {
        let version = version.to_string();
        self.post(
            self.endpoint(&["blogs", content_id.as_str(), "versions", &version, "restore"]),
            None::<&()>,
        )
        .await
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
