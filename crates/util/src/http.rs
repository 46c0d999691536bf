//! # HTTP Utilities
//!
//! Small helpers for inspecting responses: reading the declared content type
//! and producing bounded previews of response bodies for diagnostics.

use reqwest::header::{CONTENT_TYPE, HeaderMap};

/// Return the declared `Content-Type` header value, or an empty string when
/// the header is missing or not valid UTF-8.
///
/// # Example
/// ```rust
/// use oembed_util::http::content_type;
/// use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
///
/// let mut headers = HeaderMap::new();
/// headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/xml; charset=utf-8"));
/// assert_eq!(content_type(&headers), "application/xml; charset=utf-8");
/// assert_eq!(content_type(&HeaderMap::new()), "");
/// ```
pub fn content_type(headers: &HeaderMap) -> &str {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

/// Bound a response body for inclusion in error messages and logs.
///
/// Bodies up to `limit` characters are returned verbatim. Longer bodies are
/// cut on a character boundary and suffixed with `...`. A `limit` of zero
/// disables truncation.
///
/// # Example
/// ```rust
/// use oembed_util::http::body_preview;
///
/// assert_eq!(body_preview("{\"type\":", 64), "{\"type\":");
/// assert_eq!(body_preview("abcdefghij", 5), "abcde...");
/// assert_eq!(body_preview("", 5), "");
/// ```
pub fn body_preview(text: &str, limit: usize) -> String {
    if limit == 0 {
        return text.to_string();
    }
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
