//! Folding remote results into the saved draft.

use serde_json::Value;
use shared::{
    domain::{AuthoringMode, DraftInput, PromptAnalysis},
    protocol::GenerationResult,
};

pub fn with_analysis(mut draft: DraftInput, prompt: &str, analysis: PromptAnalysis) -> DraftInput {
    draft.mode = AuthoringMode::AiGenerate;
    draft.prompt = prompt.to_string();
    draft.prompt_analysis = Some(analysis);
    draft
}

/// Copies generated text into the form. Plain string content becomes the body;
/// object content fills the matching form fields and leaves the rest alone.
pub fn with_generated(
    mut draft: DraftInput,
    prompt: &str,
    generated: &GenerationResult,
) -> DraftInput {
    if draft.prompt != prompt {
        draft.prompt_analysis = None;
    }
    draft.mode = AuthoringMode::AiGenerate;
    draft.prompt = prompt.to_string();

    let form = &mut draft.form_data;
    match &generated.content {
        Value::String(body) => form.content = body.clone(),
        Value::Object(fields) => {
            let text = |name: &str| fields.get(name).and_then(Value::as_str).map(str::to_string);
            if let Some(title) = text("title") {
                form.title = title;
            }
            if let Some(content) = text("content") {
                form.content = content;
            }
            if let Some(excerpt) = text("excerpt") {
                form.excerpt = excerpt;
            }
            if let Some(category) = text("category") {
                form.category = category;
            }
        }
        _ => {}
    }
    draft
}
