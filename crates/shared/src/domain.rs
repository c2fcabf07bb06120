use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a persisted content item on the review/versioning service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(pub String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! opaque_payload {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub serde_json::Value);

        impl From<serde_json::Value> for $name {
            fn from(value: serde_json::Value) -> Self {
                Self(value)
            }
        }
    };
}

opaque_payload!(PromptAnalysis);
opaque_payload!(ReviewPayload);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AuthoringMode {
    #[default]
    Write,
    AiGenerate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    #[default]
    Html,
    Markdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
    Unpublished,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FormData {
    pub title: String,
    pub content: String,
    pub content_type: ContentType,
    pub excerpt: String,
    pub featured_image: String,
    pub category: String,
    pub status: PostStatus,
}

/// Working state of an authoring session before it is stamped and persisted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DraftInput {
    pub mode: AuthoringMode,
    pub prompt: String,
    pub prompt_analysis: Option<PromptAnalysis>,
    pub form_data: FormData,
}

/// The persisted authoring snapshot. Serialized as a flat, versionless JSON
/// record; anything that does not match this shape exactly is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DraftRecord {
    pub mode: AuthoringMode,
    pub prompt: String,
    pub prompt_analysis: Option<PromptAnalysis>,
    pub form_data: FormData,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl DraftRecord {
    pub fn stamp(input: DraftInput, timestamp: DateTime<Utc>) -> Self {
        Self {
            mode: input.mode,
            prompt: input.prompt,
            prompt_analysis: input.prompt_analysis,
            form_data: input.form_data,
            timestamp,
        }
    }

    pub fn into_input(self) -> DraftInput {
        DraftInput {
            mode: self.mode,
            prompt: self.prompt,
            prompt_analysis: self.prompt_analysis,
            form_data: self.form_data,
        }
    }
}
