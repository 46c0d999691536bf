pub mod http;
pub mod path_processing;

pub use http::{body_preview, content_type};
pub use path_processing::{expand_tilde, resolve_config_path};

use once_cell::sync::Lazy;
use regex::Regex;

static SENSITIVE_QUERY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)([?&](?:access_token|api_key|apikey|key|token|secret)=)([^&#\s]+)",
        r"(?i)(authorization: )([\w\-\.=:/+]+)",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Redacts credentials that some providers expect in the query string
/// (for example `access_token`) so URLs can be logged safely.
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for re in SENSITIVE_QUERY_PATTERNS.iter() {
        redacted = re
            .replace_all(&redacted, |caps: &regex::Captures| {
                let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                format!("{}<redacted>", prefix)
            })
            .to_string();
    }
    redacted
}
