//! JSON extraction from LLM responses.
//!
//! Models asked to "return only JSON" routinely wrap the object in prose
//! or a markdown code fence anyway. This slices from the first `{` to
//! the last `}` so the surrounding noise does not matter.

/// Extract the outermost JSON object from free text, if any.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}
