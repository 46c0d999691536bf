//! HTTP plumbing shared by discovery and endpoint fetching.
//!
//! Every request runs under the caller's [`CancellationToken`]. Cancellation
//! drops the in-flight exchange, which aborts the connection and releases the
//! response.

use std::time::Instant;

use oembed_util::{content_type, redact_sensitive};
use reqwest::header::{self, HeaderValue};
use reqwest::{Client, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::config::{EngineConfig, StatusPolicy};
use crate::error::{ConfigError, OEmbedError, Stage, TransportCause};

/// Build the HTTP client used by the engine.
pub fn build_http_client(config: &EngineConfig) -> Result<Client, ConfigError> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.timeout())
        .connect_timeout(config.connect_timeout())
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()
        .map_err(ConfigError::HttpClient)
}

/// A fully read response.
#[derive(Debug)]
pub(crate) struct FetchedBody {
    /// URL after redirects.
    pub url: Url,
    pub status: StatusCode,
    pub content_type: String,
    pub text: String,
}

/// GET `raw_url` and read the whole body, honoring `cancel` and `policy`.
pub(crate) async fn get_text(
    client: &Client,
    stage: Stage,
    raw_url: &str,
    accept: &'static str,
    policy: StatusPolicy,
    cancel: &CancellationToken,
) -> Result<FetchedBody, OEmbedError> {
    let url = Url::parse(raw_url).map_err(|source| OEmbedError::request_construction(stage, raw_url, source))?;
    let request = client
        .get(url)
        .header(header::ACCEPT, HeaderValue::from_static(accept))
        .build()
        .map_err(|source| OEmbedError::request_construction(stage, raw_url, source))?;

    let logged_url = redact_sensitive(raw_url);
    let start = Instant::now();
    debug!(stage = %stage, url = %logged_url, "http request started");

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TransportCause::Cancelled),
        outcome = exchange(client, request, policy) => outcome,
    };

    match outcome {
        Ok(body) => {
            if !body.status.is_success() {
                warn!(
                    stage = %stage,
                    url = %logged_url,
                    status = %body.status,
                    "http request returned non-success status; parsing body anyway"
                );
            }
            debug!(
                stage = %stage,
                url = %logged_url,
                status = %body.status,
                content_type = %body.content_type,
                body_len = body.text.len(),
                duration_ms = start.elapsed().as_millis(),
                "http request completed"
            );
            Ok(body)
        }
        Err(cause) => {
            warn!(
                stage = %stage,
                url = %logged_url,
                error = %cause,
                duration_ms = start.elapsed().as_millis(),
                "http request failed"
            );
            Err(OEmbedError::transport(stage, raw_url, cause))
        }
    }
}

async fn exchange(client: &Client, request: reqwest::Request, policy: StatusPolicy) -> Result<FetchedBody, TransportCause> {
    let response = client.execute(request).await?;
    let status = response.status();
    if policy == StatusPolicy::Strict && !status.is_success() {
        return Err(TransportCause::Status(status));
    }
    let url = response.url().clone();
    let content_type = content_type(response.headers()).to_string();
    let text = response.text().await?;
    Ok(FetchedBody {
        url,
        status,
        content_type,
        text,
    })
}
