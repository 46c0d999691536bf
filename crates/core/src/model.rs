//! Normalized oEmbed data and the wire formats it is decoded from.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// The normalized oEmbed response, independent of the wire format it arrived in.
///
/// Every field defaults to an empty string when the provider omits it or sends
/// `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OEmbedRecord {
    /// Resource type reported by the provider (`video`, `photo`, `rich`, `link`).
    #[serde(rename = "type", alias = "@type", deserialize_with = "null_as_empty")]
    pub kind: String,
    /// oEmbed protocol version, normally `1.0`.
    #[serde(alias = "@version", deserialize_with = "null_as_empty")]
    pub version: String,
    /// Source URL of a `photo` resource.
    #[serde(alias = "@url", deserialize_with = "null_as_empty")]
    pub url: String,
    /// Embeddable markup. In XML payloads this is always the `html` element.
    #[serde(deserialize_with = "null_as_empty")]
    pub html: String,
}

impl OEmbedRecord {
    /// Wire names of the record fields.
    pub const FIELD_NAMES: [&'static str; 4] = ["type", "version", "url", "html"];
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Wire format of an oEmbed response, picked from its declared content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    Xml,
}

impl ResponseFormat {
    /// `application/xml…` selects XML; every other content type, including a
    /// missing one, is treated as JSON.
    pub fn from_content_type(content_type: &str) -> Self {
        if content_type.starts_with("application/xml") {
            ResponseFormat::Xml
        } else {
            ResponseFormat::Json
        }
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseFormat::Json => f.write_str("JSON"),
            ResponseFormat::Xml => f.write_str("XML"),
        }
    }
}
