//! Known oEmbed providers.
//!
//! The provider table is an ordered list of URL patterns and the endpoint each
//! one maps to. It is built once, validated eagerly, and shared read-only
//! between resolvers (usually behind an `Arc`). Table order matters: the first
//! pattern that matches a URL decides how that URL is resolved.
//!
//! Tables are described in JSON:
//!
//! ```json
//! {
//!   "providers": [
//!     { "name": "Vimeo", "pattern": "^https?://(www\\.)?vimeo\\.com/", "endpoint": "https://vimeo.com/api/oembed.json" },
//!     { "name": "WordPress.com", "pattern": "^https?://[^/]+\\.wordpress\\.com/", "endpoint": "https://public-api.wordpress.com/oembed/", "discovery": true }
//!   ]
//! }
//! ```

use std::env;
use std::fs;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::ProviderTableError;

const BUILTIN_PROVIDERS: &str = include_str!("../data/providers.json");

/// Environment variable pointing at a provider table that replaces the built-in one.
pub const PROVIDERS_PATH_ENV: &str = "OEMBED_PROVIDERS_PATH";

/// Serialized form of a provider table entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProviderEntry {
    pub name: String,
    pub pattern: String,
    pub endpoint: String,
    /// When set, matching URLs skip the endpoint and go straight to discovery.
    #[serde(default)]
    pub discovery: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProviderFile {
    providers: Vec<ProviderEntry>,
}

/// A compiled provider entry.
#[derive(Debug, Clone)]
pub struct ProviderPattern {
    name: String,
    matcher: Regex,
    endpoint_template: Url,
    requires_discovery: bool,
}

impl ProviderPattern {
    /// Compile a provider entry, failing on an invalid pattern or endpoint.
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        endpoint: &str,
        requires_discovery: bool,
    ) -> Result<Self, ProviderTableError> {
        let name = name.into();
        let matcher = Regex::new(pattern).map_err(|source| ProviderTableError::InvalidPattern {
            name: name.clone(),
            pattern: pattern.to_string(),
            source,
        })?;
        let endpoint_template = Url::parse(endpoint).map_err(|source| ProviderTableError::InvalidEndpoint {
            name: name.clone(),
            endpoint: endpoint.to_string(),
            source,
        })?;
        if !matches!(endpoint_template.scheme(), "http" | "https") {
            return Err(ProviderTableError::UnsupportedScheme {
                name,
                scheme: endpoint_template.scheme().to_string(),
            });
        }

        Ok(Self {
            name,
            matcher,
            endpoint_template,
            requires_discovery,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matcher(&self) -> &Regex {
        &self.matcher
    }

    pub fn endpoint_template(&self) -> &Url {
        &self.endpoint_template
    }

    pub fn requires_discovery(&self) -> bool {
        self.requires_discovery
    }

    pub fn matches(&self, url: &str) -> bool {
        self.matcher.is_match(url)
    }

    /// Build the request URL for `target_url`: the endpoint template with a
    /// form-encoded `url` query parameter appended.
    pub fn endpoint_for(&self, target_url: &str) -> String {
        let mut endpoint = self.endpoint_template.clone();
        endpoint.query_pairs_mut().append_pair("url", target_url);
        endpoint.into()
    }
}

impl TryFrom<&ProviderEntry> for ProviderPattern {
    type Error = ProviderTableError;

    fn try_from(entry: &ProviderEntry) -> Result<Self, Self::Error> {
        ProviderPattern::new(entry.name.clone(), &entry.pattern, &entry.endpoint, entry.discovery)
    }
}

/// Ordered, immutable collection of provider patterns.
#[derive(Debug, Clone, Default)]
pub struct ProviderTable {
    patterns: Vec<ProviderPattern>,
}

impl ProviderTable {
    pub fn new(patterns: Vec<ProviderPattern>) -> Self {
        Self { patterns }
    }

    /// The table shipped with the crate.
    pub fn builtin() -> Result<Self, ProviderTableError> {
        Self::from_json_str(BUILTIN_PROVIDERS, "<builtin>")
    }

    /// Parse and compile a JSON table. `origin` only labels errors.
    pub fn from_json_str(content: &str, origin: &str) -> Result<Self, ProviderTableError> {
        let file: ProviderFile = serde_json::from_str(content).map_err(|source| ProviderTableError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        Self::from_entries(&file.providers)
    }

    pub fn from_entries(entries: &[ProviderEntry]) -> Result<Self, ProviderTableError> {
        let patterns = entries
            .iter()
            .map(ProviderPattern::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(patterns))
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ProviderTableError> {
        let content = fs::read_to_string(path).map_err(|source| ProviderTableError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let table = Self::from_json_str(&content, &path.display().to_string())?;
        debug!(path = %path.display(), providers = table.len(), "loaded provider table");
        Ok(table)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderPattern> {
        self.patterns.iter()
    }

    /// First entry whose pattern matches `url`, in table order.
    pub fn first_match(&self, url: &str) -> Option<&ProviderPattern> {
        self.patterns.iter().find(|pattern| pattern.matches(url))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl<'a> IntoIterator for &'a ProviderTable {
    type Item = &'a ProviderPattern;
    type IntoIter = std::slice::Iter<'a, ProviderPattern>;

    fn into_iter(self) -> Self::IntoIter {
        self.patterns.iter()
    }
}

/// Load the provider table.
///
/// Resolution order: `OEMBED_PROVIDERS_PATH`, then `configured_path`, then the
/// built-in table.
pub fn load_provider_table(configured_path: Option<&Path>) -> Result<ProviderTable, ProviderTableError> {
    if let Ok(path) = env::var(PROVIDERS_PATH_ENV)
        && !path.trim().is_empty()
    {
        return ProviderTable::load_from_path(&oembed_util::expand_tilde(&path));
    }
    match configured_path {
        Some(path) => ProviderTable::load_from_path(path),
        None => ProviderTable::builtin(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_compiles() {
        let table = ProviderTable::builtin().expect("builtin table");
        assert!(!table.is_empty());
        assert!(table.iter().any(ProviderPattern::requires_discovery));
    }

    #[test]
    fn builtin_table_routes_common_urls() {
        let table = ProviderTable::builtin().expect("builtin table");
        let youtube = table.first_match("https://www.youtube.com/watch?v=dQw4w9WgXcQ").expect("youtube");
        assert_eq!(youtube.endpoint_template().as_str(), "https://www.youtube.com/oembed");
        let short = table.first_match("https://youtu.be/dQw4w9WgXcQ").expect("youtu.be");
        assert_eq!(short.endpoint_template().as_str(), "https://www.youtube.com/oembed");
        let blog = table.first_match("https://someone.wordpress.com/2024/01/01/hello/").expect("wordpress");
        assert!(blog.requires_discovery());
        assert!(table.first_match("https://example.com/article").is_none());
    }

    #[test]
    fn endpoint_for_appends_encoded_url() {
        let pattern = ProviderPattern::new("Vimeo", "vimeo", "https://vimeo.com/api/oembed.json", false).expect("pattern");
        assert_eq!(
            pattern.endpoint_for("https://vimeo.com/76979871?a=1&b=two words"),
            "https://vimeo.com/api/oembed.json?url=https%3A%2F%2Fvimeo.com%2F76979871%3Fa%3D1%26b%3Dtwo+words"
        );
    }

    #[test]
    fn endpoint_for_keeps_existing_query() {
        let pattern = ProviderPattern::new("Flickr", "flickr", "https://www.flickr.com/services/oembed/?format=json", false)
            .expect("pattern");
        assert_eq!(
            pattern.endpoint_for("https://flic.kr/p/abc"),
            "https://www.flickr.com/services/oembed/?format=json&url=https%3A%2F%2Fflic.kr%2Fp%2Fabc"
        );
    }

    #[test]
    fn invalid_pattern_fails_fast() {
        let error = ProviderPattern::new("Broken", "([a-z", "https://example.com/oembed", false).expect_err("must fail");
        assert!(matches!(error, ProviderTableError::InvalidPattern { ref name, .. } if name == "Broken"));
    }

    #[test]
    fn invalid_endpoint_fails_fast() {
        let error = ProviderPattern::new("Broken", ".*", "not a url", false).expect_err("must fail");
        assert!(matches!(error, ProviderTableError::InvalidEndpoint { .. }));

        let error = ProviderPattern::new("Ftp", ".*", "ftp://example.com/oembed", false).expect_err("must fail");
        assert!(matches!(error, ProviderTableError::UnsupportedScheme { ref scheme, .. } if scheme == "ftp"));
    }

    #[test]
    fn table_order_is_preserved() {
        let table = ProviderTable::from_json_str(
            r#"{"providers":[
                {"name":"first","pattern":"example","endpoint":"https://one.example/oembed"},
                {"name":"second","pattern":"example","endpoint":"https://two.example/oembed"}
            ]}"#,
            "inline",
        )
        .expect("table");
        let names: Vec<_> = table.iter().map(ProviderPattern::name).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(table.first_match("https://example.com").map(ProviderPattern::name), Some("first"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let error = ProviderTable::from_json_str(
            r#"{"providers":[{"name":"x","pattern":"x","endpoint":"https://x.example","extra":1}]}"#,
            "inline",
        )
        .expect_err("must fail");
        assert!(matches!(error, ProviderTableError::Parse { .. }));
    }

    #[test]
    fn env_override_loads_table_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("providers.json");
        fs::write(
            &path,
            r#"{"providers":[{"name":"Only","pattern":"only","endpoint":"https://only.example/oembed"}]}"#,
        )
        .expect("write");

        temp_env::with_var(PROVIDERS_PATH_ENV, Some(path.to_str().expect("utf-8 path")), || {
            let table = load_provider_table(None).expect("table");
            assert_eq!(table.len(), 1);
            assert_eq!(table.iter().next().map(ProviderPattern::name), Some("Only"));
        });
    }

    #[test]
    fn missing_file_is_an_io_error() {
        temp_env::with_var_unset(PROVIDERS_PATH_ENV, || {
            let error = load_provider_table(Some(Path::new("/definitely/not/here.json"))).expect_err("must fail");
            assert!(matches!(error, ProviderTableError::Io { .. }));
        });
    }
}
