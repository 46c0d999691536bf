//! Fetching and decoding oEmbed responses.

use oembed_util::body_preview;
use reqwest::Client;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::StatusPolicy;
use crate::error::{DecodeCause, OEmbedError, Stage};
use crate::http::get_text;
use crate::model::{OEmbedRecord, ResponseFormat};

const OEMBED_ACCEPT: &str = "application/json, application/xml;q=0.9, text/xml;q=0.8";

impl ResponseFormat {
    /// Decode a response body in this format.
    pub fn decode(self, body: &str) -> Result<OEmbedRecord, DecodeCause> {
        match self {
            ResponseFormat::Json => Ok(decode_json(body)?),
            ResponseFormat::Xml => Ok(quick_xml::de::from_str(body)?),
        }
    }
}

/// JSON field names match case-insensitively; an exact-case key wins over a
/// folded one.
fn decode_json(body: &str) -> Result<OEmbedRecord, serde_json::Error> {
    let mut object: Map<String, Value> = serde_json::from_str(body)?;
    let folded: Vec<(String, Value)> = object
        .iter()
        .filter_map(|(key, value)| {
            let lower = key.to_lowercase();
            (lower != *key && OEmbedRecord::FIELD_NAMES.contains(&lower.as_str())).then(|| (lower, value.clone()))
        })
        .collect();
    for (key, value) in folded {
        object.entry(key).or_insert(value);
    }
    serde_json::from_value(Value::Object(object))
}

#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    status_policy: StatusPolicy,
    max_body_preview: usize,
}

impl Fetcher {
    pub fn new(client: Client, status_policy: StatusPolicy, max_body_preview: usize) -> Self {
        Self {
            client,
            status_policy,
            max_body_preview,
        }
    }

    /// Request `endpoint_url` and decode the response by its declared content type.
    pub async fn fetch(&self, endpoint_url: &str, cancel: &CancellationToken) -> Result<OEmbedRecord, OEmbedError> {
        let response = get_text(&self.client, Stage::Fetch, endpoint_url, OEMBED_ACCEPT, self.status_policy, cancel).await?;
        let format = ResponseFormat::from_content_type(&response.content_type);

        format.decode(&response.text).map_err(|source| {
            warn!(
                url = %oembed_util::redact_sensitive(endpoint_url),
                status = %response.status,
                format = %format,
                body_len = response.text.len(),
                error = %source,
                "oembed response decode failed"
            );
            OEmbedError::Decode {
                stage: Stage::Fetch,
                url: endpoint_url.to_string(),
                status: response.status,
                format,
                body: body_preview(&response.text, self.max_body_preview),
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_json_record() {
        let record = ResponseFormat::Json
            .decode(r#"{"type":"video","version":"1.0","url":"x","html":"<iframe></iframe>"}"#)
            .expect("json");
        assert_eq!(
            record,
            OEmbedRecord {
                kind: "video".into(),
                version: "1.0".into(),
                url: "x".into(),
                html: "<iframe></iframe>".into(),
            }
        );
    }

    #[test]
    fn json_ignores_extra_fields_and_defaults_missing_ones() {
        let record = ResponseFormat::Json
            .decode(r#"{"type":"rich","provider_name":"Example","width":480,"html":"<div></div>"}"#)
            .expect("json");
        assert_eq!(record.kind, "rich");
        assert_eq!(record.html, "<div></div>");
        assert_eq!(record.version, "");
        assert_eq!(record.url, "");
    }

    #[test]
    fn json_field_names_match_case_insensitively() {
        let record = ResponseFormat::Json
            .decode(r#"{"Type":"video","HTML":"<i>","Version":"1.0"}"#)
            .expect("json");
        assert_eq!(record.kind, "video");
        assert_eq!(record.html, "<i>");
        assert_eq!(record.version, "1.0");
    }

    #[test]
    fn exact_case_json_key_wins() {
        let record = ResponseFormat::Json
            .decode(r#"{"Type":"video","type":"rich"}"#)
            .expect("json");
        assert_eq!(record.kind, "rich");
    }

    #[test]
    fn decodes_xml_record_with_cdata() {
        let record = ResponseFormat::Xml
            .decode("<oembed><type>photo</type><html><![CDATA[<img>]]></html></oembed>")
            .expect("xml");
        assert_eq!(record.kind, "photo");
        assert_eq!(record.html, "<img>");
        assert_eq!(record.version, "");
    }

    #[test]
    fn decodes_full_xml_document() {
        let body = r#"<?xml version="1.0" encoding="utf-8" standalone="yes"?>
<oembed>
  <version>1.0</version>
  <type>video</type>
  <provider_name>Example</provider_name>
  <url>https://media.example/v/1</url>
  <html>&lt;iframe src="https://media.example/embed/1"&gt;&lt;/iframe&gt;</html>
</oembed>"#;
        let record = ResponseFormat::Xml.decode(body).expect("xml");
        assert_eq!(record.version, "1.0");
        assert_eq!(record.kind, "video");
        assert_eq!(record.url, "https://media.example/v/1");
        assert_eq!(record.html, r#"<iframe src="https://media.example/embed/1"></iframe>"#);
    }

    #[test]
    fn xml_field_names_are_case_sensitive() {
        let record = ResponseFormat::Xml
            .decode("<oembed><Type>photo</Type><html>x</html></oembed>")
            .expect("xml");
        assert_eq!(record.kind, "");
        assert_eq!(record.html, "x");
    }

    #[test]
    fn xml_html_with_child_elements_is_rejected() {
        let error = ResponseFormat::Xml
            .decode("<oembed><type>rich</type><html><div>hi</div></html></oembed>")
            .expect_err("must fail");
        assert!(matches!(error, DecodeCause::Xml(_)));
    }

    #[test]
    fn malformed_json_is_a_decode_cause() {
        let error = ResponseFormat::Json.decode(r#"{"type":"#).expect_err("must fail");
        assert!(matches!(error, DecodeCause::Json(_)));
    }

    #[test]
    fn malformed_xml_is_a_decode_cause() {
        let error = ResponseFormat::Xml
            .decode("<oembed><type>photo</oembed>")
            .expect_err("must fail");
        assert!(matches!(error, DecodeCause::Xml(_)));
    }
}
