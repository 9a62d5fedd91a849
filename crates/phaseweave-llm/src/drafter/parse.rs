use serde_json::Value;

/// Extract the contents of a JSON code fence, if the reply carries one.
///
/// A generic ``` fence only counts when its body starts with `{`, so
/// fenced shell snippets in a chatty reply don't get mistaken for a
/// workflow draft.
pub(crate) fn fenced_json(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if let Some(start) = trimmed.find("```json") {
        let after_fence = &trimmed[start + 7..];
        if let Some(end) = after_fence.find("```") {
            return Some(after_fence[..end].trim());
        }
    }
    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        if let Some(end) = after_fence.find("```") {
            let candidate = after_fence[..end].trim();
            if candidate.starts_with('{') {
                return Some(candidate);
            }
        }
    }
    None
}

/// Scan free-form text for a balanced `{...}` object that parses and
/// looks like a workflow (has `nodes` and `connections`). Fallback for
/// models that inline the document without a fence.
pub(crate) fn find_embedded_workflow(text: &str) -> Option<Value> {
    let mut depth = 0usize;
    let mut start = None;
    for (i, byte) in text.bytes().enumerate() {
        match byte {
            b'{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            b'}' if depth > 0 => {
                depth -= 1;
                if depth == 0
                    && let Some(s) = start
                    && let Ok(value) = serde_json::from_str::<Value>(&text[s..=i])
                    && value.get("nodes").is_some()
                    && value.get("connections").is_some()
                {
                    return Some(value);
                }
            }
            _ => {}
        }
    }
    None
}
