//! Extraction of JSON answers from model text.

use serde::de::DeserializeOwned;

use crate::domain::errors::ToolError;

/// Strip a surrounding markdown code fence, if any.
fn strip_markdown_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let clean = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    clean.strip_suffix("```").unwrap_or(clean).trim()
}

/// Outermost `{ ... }` span of the text.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start <= end).then(|| &text[start..=end])
}

/// Decode a model answer expected to hold a single JSON object.
pub fn parse_model_json<T: DeserializeOwned>(raw: &str) -> Result<T, ToolError> {
    let clean = strip_markdown_fences(raw);
    let object = extract_json_object(clean)
        .ok_or_else(|| ToolError::Decode("no JSON object in model output".to_string()))?;
    Ok(serde_json::from_str(object)?)
}
