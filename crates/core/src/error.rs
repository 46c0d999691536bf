//! Error types for oEmbed resolution.

use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

use crate::model::ResponseFormat;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Pipeline stage that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Matching the target URL against the provider table.
    Resolve,
    /// Fetching the target page and scanning it for an oEmbed link.
    Discovery,
    /// Requesting and decoding the oEmbed endpoint.
    Fetch,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Resolve => f.write_str("resolve"),
            Stage::Discovery => f.write_str("discovery"),
            Stage::Fetch => f.write_str("fetch"),
        }
    }
}

/// Coarse classification of an [`OEmbedError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RequestConstruction,
    Transport,
    Decode,
    EndpointNotFound,
}

/// Main error type for oEmbed operations.
#[derive(Debug, Error)]
pub enum OEmbedError {
    #[error("{stage}: couldn't build request for '{url}': {source}")]
    RequestConstruction {
        stage: Stage,
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("{stage}: request to '{url}' failed: {source}")]
    Transport {
        stage: Stage,
        url: String,
        #[source]
        source: TransportCause,
    },

    #[error("{stage}: couldn't decode {format} body from '{url}' (status {status}): {source}. body: {body}")]
    Decode {
        stage: Stage,
        url: String,
        status: StatusCode,
        format: ResponseFormat,
        body: String,
        #[source]
        source: DecodeCause,
    },

    #[error("couldn't find oEmbed URL for '{url}'")]
    EndpointNotFound { url: String },
}

/// Why a request did not produce a usable response.
#[derive(Debug, Error)]
pub enum TransportCause {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("request cancelled")]
    Cancelled,

    #[error("unexpected HTTP status {0}")]
    Status(StatusCode),
}

/// Decoder failure for one of the supported wire formats.
#[derive(Debug, Error)]
pub enum DecodeCause {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Xml(#[from] quick_xml::DeError),
}

impl OEmbedError {
    /// Create a request construction error.
    pub fn request_construction(stage: Stage, url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::RequestConstruction {
            stage,
            url: url.into(),
            source: source.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(stage: Stage, url: impl Into<String>, source: impl Into<TransportCause>) -> Self {
        Self::Transport {
            stage,
            url: url.into(),
            source: source.into(),
        }
    }

    /// Create an endpoint not found error.
    pub fn endpoint_not_found(url: impl Into<String>) -> Self {
        Self::EndpointNotFound { url: url.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RequestConstruction { .. } => ErrorKind::RequestConstruction,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::EndpointNotFound { .. } => ErrorKind::EndpointNotFound,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            Self::RequestConstruction { stage, .. } | Self::Transport { stage, .. } | Self::Decode { stage, .. } => *stage,
            Self::EndpointNotFound { .. } => Stage::Resolve,
        }
    }

    /// URL the failing stage was working on.
    pub fn url(&self) -> &str {
        match self {
            Self::RequestConstruction { url, .. }
            | Self::Transport { url, .. }
            | Self::Decode { url, .. }
            | Self::EndpointNotFound { url } => url,
        }
    }

    /// Whether the failure came from the caller's cancellation signal.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Transport {
                source: TransportCause::Cancelled,
                ..
            }
        )
    }

    /// The (bounded) response body captured for a decode failure.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Decode { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Errors raised while loading or validating the provider table.
#[derive(Debug, Error)]
pub enum ProviderTableError {
    #[error("provider '{name}': invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        name: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("provider '{name}': invalid endpoint '{endpoint}': {source}")]
    InvalidEndpoint {
        name: String,
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    #[error("provider '{name}': endpoint scheme must be http or https, got '{scheme}'")]
    UnsupportedScheme { name: String, scheme: String },

    #[error("couldn't read provider table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("couldn't parse provider table {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised while loading engine configuration or building its HTTP client.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("couldn't read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("couldn't parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("couldn't build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error(transparent)]
    Providers(#[from] ProviderTableError),
}
