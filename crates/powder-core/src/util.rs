//! Shared utility functions used across multiple modules.

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Check if a string starts with `http://` or `https://`.
pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Truncate text to at most 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

/// Readable message from a Supabase error body, tagged with the status.
///
/// GoTrue, PostgREST and Storage each name the message field differently.
pub fn api_error_message(status: u16, body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|payload| {
            ["message", "msg", "error_description", "error"]
                .into_iter()
                .find_map(|key| payload.get(key)?.as_str().map(compact_text))
        })
        .unwrap_or_else(|| compact_text(body));

    if detail.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("{detail} ({status})")
    }
}

/// Current Unix timestamp in milliseconds.
pub fn unix_millis_now() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Current Unix timestamp in seconds.
pub fn unix_timestamp_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Trim a base URL and require an http(s) scheme.
pub fn normalize_base_url(raw: &str, what: &str) -> Result<String, String> {
    let base = raw.trim().trim_end_matches('/').to_string();
    if base.is_empty() {
        return Err(format!("{what} must not be empty"));
    }
    if !is_http_url(&base) {
        return Err(format!("{what} must include http:// or https://"));
    }
    Ok(base)
}
