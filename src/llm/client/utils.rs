use regex::Regex;
use std::sync::LazyLock;

static JSON_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```json\r?\n(.*?)\r?\n```").expect("json fence pattern is valid")
});

/// Content of the first ```` ```json ```` fenced block, trimmed; the whole text otherwise
pub fn extract_json_block(text: &str) -> &str {
    JSON_FENCE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(text)
}
