use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{ContentId, PromptAnalysis, ReviewPayload};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzePromptRequest {
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzePromptResponse {
    pub analysis: PromptAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateBlogRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<PromptAnalysis>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub content: Value,
    #[serde(default)]
    pub metadata: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<ContentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<ReviewPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewResult {
    #[serde(default)]
    pub suggestions: Vec<Value>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyReviewRequest {
    pub payload: ReviewPayload,
}

/// Reference to a content item as returned by mutations on the review service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentReference {
    #[serde(alias = "_id")]
    pub id: ContentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

pub type VersionRestoreOutcome = ContentReference;
