use once_cell::sync::Lazy;
use regex::Regex;

static FENCED_JSON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\}|\[.*?\])\s*```").expect("valid fenced block pattern")
});

pub fn escape_xml(input: &str) -> String {
    let mut escaped = String::new();
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Pulls the flowchart JSON out of generated text.
///
/// A fenced code block wins; otherwise the span from the first `{` to the
/// last `}` is used when it mentions a `"nodes"` key.
pub fn extract_json_payload(content: &str) -> Option<&str> {
    if let Some(captures) = FENCED_JSON.captures(content) {
        return captures.get(1).map(|m| m.as_str());
    }

    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end <= start {
        return None;
    }

    let candidate = &content[start..=end];
    candidate.contains("\"nodes\"").then_some(candidate)
}
