//! Endpoint resolution: provider table first, discovery second.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::discover::Discoverer;
use crate::error::{OEmbedError, Stage};
use crate::providers::{ProviderPattern, ProviderTable};

/// Result of consulting the provider table alone.
#[derive(Debug, Clone, Copy)]
pub enum TableLookup<'a> {
    /// A provider matched and serves the URL directly.
    Endpoint(&'a ProviderPattern),
    /// A discovery-only provider matched; scanning stopped there.
    DiscoveryRequired(&'a ProviderPattern),
    NoMatch,
}

#[derive(Debug, Clone)]
pub struct Resolver {
    providers: Arc<ProviderTable>,
    discoverer: Discoverer,
}

impl Resolver {
    pub fn new(providers: Arc<ProviderTable>, discoverer: Discoverer) -> Self {
        Self { providers, discoverer }
    }

    pub fn providers(&self) -> &ProviderTable {
        &self.providers
    }

    /// Scan the table in order. The first matching entry decides, even when it
    /// only asks for discovery.
    pub fn lookup(&self, target_url: &str) -> TableLookup<'_> {
        match self.providers.first_match(target_url) {
            Some(pattern) if pattern.requires_discovery() => TableLookup::DiscoveryRequired(pattern),
            Some(pattern) => TableLookup::Endpoint(pattern),
            None => TableLookup::NoMatch,
        }
    }

    /// Determine the oEmbed endpoint for `target_url`.
    ///
    /// Table hits never touch the network. Otherwise the page is fetched once
    /// for discovery; a page without an advertised endpoint yields
    /// [`OEmbedError::EndpointNotFound`].
    pub async fn resolve(&self, target_url: &str, cancel: &CancellationToken) -> Result<String, OEmbedError> {
        match self.lookup(target_url) {
            TableLookup::Endpoint(pattern) => {
                let endpoint = pattern.endpoint_for(target_url);
                debug!(provider = pattern.name(), url = %target_url, "resolved endpoint from provider table");
                return Ok(endpoint);
            }
            TableLookup::DiscoveryRequired(pattern) => {
                debug!(provider = pattern.name(), url = %target_url, "provider requires discovery");
            }
            TableLookup::NoMatch => {
                debug!(url = %target_url, "no provider matched; falling back to discovery");
            }
        }

        let discovery = self.discoverer.discover_page(target_url, cancel).await?;
        if discovery.href.is_empty() {
            return Err(OEmbedError::endpoint_not_found(target_url));
        }
        absolutize(&discovery.href, &discovery.page_url)
    }
}

/// Resolve a relative `href` against the page it was found on. Absolute hrefs
/// are returned untouched.
fn absolutize(href: &str, page_url: &str) -> Result<String, OEmbedError> {
    match Url::parse(href) {
        Ok(_) => Ok(href.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(page_url)
            .and_then(|base| base.join(href))
            .map(String::from)
            .map_err(|source| OEmbedError::request_construction(Stage::Resolve, href, source)),
        Err(source) => Err(OEmbedError::request_construction(Stage::Resolve, href, source)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StatusPolicy;
    use crate::error::ErrorKind;

    fn resolver(entries: &[(&str, &str, &str, bool)]) -> Resolver {
        let patterns = entries
            .iter()
            .map(|(name, pattern, endpoint, discovery)| {
                ProviderPattern::new(*name, pattern, endpoint, *discovery).expect("valid pattern")
            })
            .collect();
        Resolver::new(
            Arc::new(ProviderTable::new(patterns)),
            Discoverer::new(reqwest::Client::new(), StatusPolicy::Lenient),
        )
    }

    #[test]
    fn lookup_stops_at_discovery_only_entry() {
        let resolver = resolver(&[
            ("blog", r"^https://blog\.example/", "https://blog.example/oembed", true),
            ("catch-all", r"^https://", "https://catch.example/oembed", false),
        ]);
        assert!(matches!(
            resolver.lookup("https://blog.example/post/1"),
            TableLookup::DiscoveryRequired(pattern) if pattern.name() == "blog"
        ));
        assert!(matches!(
            resolver.lookup("https://other.example/"),
            TableLookup::Endpoint(pattern) if pattern.name() == "catch-all"
        ));
        assert!(matches!(resolver.lookup("ftp://files.example/"), TableLookup::NoMatch));
    }

    #[tokio::test]
    async fn table_hit_builds_endpoint_without_network() {
        let resolver = resolver(&[("video", r"^https://video\.example/", "https://video.example/oembed", false)]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        // A cancelled token would fail any request, so success proves no I/O happened.
        let endpoint = resolver
            .resolve("https://video.example/watch?v=1", &cancel)
            .await
            .expect("table hit");
        assert_eq!(endpoint, "https://video.example/oembed?url=https%3A%2F%2Fvideo.example%2Fwatch%3Fv%3D1");
    }

    #[tokio::test]
    async fn unparseable_target_is_a_request_construction_error() {
        let resolver = resolver(&[]);
        let error = resolver
            .resolve("not a url", &CancellationToken::new())
            .await
            .expect_err("must fail");
        assert_eq!(error.kind(), ErrorKind::RequestConstruction);
        assert_eq!(error.stage(), Stage::Discovery);
    }

    #[test]
    fn absolutize_keeps_absolute_and_joins_relative() {
        assert_eq!(
            absolutize("https://cdn.example/oembed?url=x", "https://site.example/post").expect("absolute"),
            "https://cdn.example/oembed?url=x"
        );
        assert_eq!(
            absolutize("/oembed?url=x", "https://site.example/posts/1").expect("relative"),
            "https://site.example/oembed?url=x"
        );
        assert_eq!(
            absolutize("oembed.json", "https://site.example/posts/1").expect("relative"),
            "https://site.example/posts/oembed.json"
        );
    }
}
