//! Composition root: resolve an endpoint, then fetch and decode it.

use std::sync::Arc;
use std::time::Instant;

use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::discover::Discoverer;
use crate::error::{ConfigError, OEmbedError};
use crate::fetch::Fetcher;
use crate::http::build_http_client;
use crate::model::OEmbedRecord;
use crate::providers::ProviderTable;
use crate::resolve::Resolver;

/// Resolves page URLs to oEmbed records.
///
/// Cheap to clone: the HTTP client and the provider table are shared.
#[derive(Debug, Clone)]
pub struct Engine {
    resolver: Resolver,
    fetcher: Fetcher,
}

impl Engine {
    /// Build an engine with a fresh HTTP client configured from `config`.
    pub fn new(config: &EngineConfig, providers: Arc<ProviderTable>) -> Result<Self, ConfigError> {
        let client = build_http_client(config)?;
        Ok(Self::with_client(client, config, providers))
    }

    /// Build an engine around an existing HTTP client.
    pub fn with_client(client: Client, config: &EngineConfig, providers: Arc<ProviderTable>) -> Self {
        let discoverer = Discoverer::new(client.clone(), config.status_policy);
        Self {
            resolver: Resolver::new(providers, discoverer),
            fetcher: Fetcher::new(client, config.status_policy, config.max_body_preview),
        }
    }

    /// Build an engine and load the provider table `config` points at.
    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        let providers = config.load_providers()?;
        Self::new(config, Arc::new(providers))
    }

    pub fn providers(&self) -> &ProviderTable {
        self.resolver.providers()
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Determine the endpoint for `target_url` without fetching it.
    pub async fn resolve(&self, target_url: &str, cancel: &CancellationToken) -> Result<String, OEmbedError> {
        self.resolver.resolve(target_url, cancel).await
    }

    /// Resolve `target_url` and return its decoded oEmbed record.
    ///
    /// The first failure from either stage is returned as is.
    pub async fn get_embed(&self, target_url: &str, cancel: &CancellationToken) -> Result<OEmbedRecord, OEmbedError> {
        let start = Instant::now();
        let endpoint = self.resolver.resolve(target_url, cancel).await?;
        debug!(url = %target_url, endpoint = %oembed_util::redact_sensitive(&endpoint), "resolved oembed endpoint");

        let record = self.fetcher.fetch(&endpoint, cancel).await?;
        info!(
            url = %target_url,
            kind = %record.kind,
            has_html = !record.html.is_empty(),
            duration_ms = start.elapsed().as_millis(),
            "oembed record fetched"
        );
        Ok(record)
    }
}
