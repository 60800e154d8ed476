//! Common utilities for LLM providers

/// Minimum key length to display partial key
const MIN_KEY_LENGTH_FOR_PARTIAL_DISPLAY: usize = 8;

/// Number of characters to show at start/end of masked key
const KEY_MASK_VISIBLE_CHARS: usize = 4;

/// Longest provider message kept in errors and logs
const MAX_ERROR_LEN: usize = 300;

/// Mask API key for safe display in logs
///
/// Shows first 4 and last 4 characters for keys longer than 8 characters,
/// otherwise shows "****" to prevent exposure of short keys.
///
/// # Examples
/// ```
/// use medgate_llm::util::mask_api_key;
/// assert_eq!(mask_api_key("sk-1234567890abcdef"), "sk-1...cdef");
/// assert_eq!(mask_api_key("short"), "****");
/// ```
#[must_use]
pub fn mask_api_key(key: &str) -> String {
    if key.len() <= MIN_KEY_LENGTH_FOR_PARTIAL_DISPLAY || !key.is_ascii() {
        return "****".to_string();
    }
    format!(
        "{}...{}",
        &key[..KEY_MASK_VISIBLE_CHARS],
        &key[key.len() - KEY_MASK_VISIBLE_CHARS..]
    )
}

/// Truncate to at most `max_chars` characters without splitting a char
#[must_use]
pub fn truncate_safe(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Make a provider error message safe to log and store.
///
/// Removes the credential if the provider echoed it back and caps the length.
#[must_use]
pub fn sanitize_api_error(error: &str, api_key: Option<&str>) -> String {
    let mut cleaned = error.trim().to_string();
    if let Some(key) = api_key.filter(|k| !k.is_empty()) {
        cleaned = cleaned.replace(key, &mask_api_key(key));
    }
    if cleaned.chars().count() > MAX_ERROR_LEN {
        format!("{}...(truncated)", truncate_safe(&cleaned, MAX_ERROR_LEN))
    } else {
        cleaned
    }
}
