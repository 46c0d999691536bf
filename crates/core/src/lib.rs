//! oEmbed resolution engine.
//!
//! Given a page URL, the [`Engine`] finds the matching oEmbed endpoint, either
//! from the ordered [`ProviderTable`] or by discovering a
//! `<link type="…+oembed">` in the page itself, then fetches the endpoint and
//! decodes the JSON or XML response into an [`OEmbedRecord`].
//!
//! ```ignore
//! use std::sync::Arc;
//! use oembed_core::{Engine, EngineConfig, ProviderTable};
//! use tokio_util::sync::CancellationToken;
//!
//! let engine = Engine::new(&EngineConfig::default(), Arc::new(ProviderTable::builtin()?))?;
//! let record = engine
//!     .get_embed("https://vimeo.com/76979871", &CancellationToken::new())
//!     .await?;
//! println!("{}", record.html);
//! ```

pub mod config;
pub mod discover;
pub mod engine;
pub mod error;
pub mod fetch;
mod http;
pub mod model;
pub mod providers;
pub mod resolve;

pub use config::{EngineConfig, StatusPolicy, default_config_path, load_config, load_config_from_path};
pub use discover::{Discoverer, Discovery, find_oembed_link};
pub use engine::Engine;
pub use error::{ConfigError, DecodeCause, ErrorKind, OEmbedError, ProviderTableError, Stage, TransportCause};
pub use fetch::Fetcher;
pub use http::build_http_client;
pub use model::{OEmbedRecord, ResponseFormat};
pub use providers::{ProviderEntry, ProviderPattern, ProviderTable, load_provider_table};
pub use resolve::{Resolver, TableLookup};
pub use tokio_util::sync::CancellationToken;
