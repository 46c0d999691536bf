//! oEmbed discovery.
//!
//! Pages advertise their endpoint with a link element such as
//! `<link rel="alternate" type="application/json+oembed" href="…">`. The
//! discoverer fetches the page, parses it leniently and returns the `href` of
//! the first such link in document order.

use reqwest::Client;
use scraper::{Html, Node};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::StatusPolicy;
use crate::error::{OEmbedError, Stage};
use crate::http::get_text;

const OEMBED_TYPE_SUFFIX: &str = "+oembed";
const HTML_ACCEPT: &str = "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8";

/// Outcome of a discovery run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    /// Advertised endpoint, or an empty string when the page advertises none.
    pub href: String,
    /// Page URL after redirects; relative hrefs resolve against it.
    pub page_url: String,
}

#[derive(Debug, Clone)]
pub struct Discoverer {
    client: Client,
    status_policy: StatusPolicy,
}

impl Discoverer {
    pub fn new(client: Client, status_policy: StatusPolicy) -> Self {
        Self { client, status_policy }
    }

    /// Fetch `page_url` and return the advertised oEmbed endpoint.
    ///
    /// An empty string means the page was fetched but advertises no endpoint;
    /// that is not an error at this level.
    pub async fn discover(&self, page_url: &str, cancel: &CancellationToken) -> Result<String, OEmbedError> {
        Ok(self.discover_page(page_url, cancel).await?.href)
    }

    /// Like [`Discoverer::discover`], also reporting the final page URL.
    pub async fn discover_page(&self, page_url: &str, cancel: &CancellationToken) -> Result<Discovery, OEmbedError> {
        let page = get_text(&self.client, Stage::Discovery, page_url, HTML_ACCEPT, self.status_policy, cancel).await?;
        let href = find_oembed_link(&page.text).unwrap_or_default();
        debug!(url = %page_url, found = !href.is_empty(), "oembed discovery finished");
        Ok(Discovery {
            href,
            page_url: page.url.into(),
        })
    }
}

/// Return the `href` of the first `<link>` whose `type` ends with `+oembed`.
///
/// The document is walked depth-first in pre-order with an explicit stack, so
/// deeply nested markup cannot exhaust the call stack. Links with a matching
/// type but a missing or empty `href` are skipped.
pub fn find_oembed_link(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let mut stack = vec![document.tree.root()];

    while let Some(node) = stack.pop() {
        if let Node::Element(element) = node.value()
            && element.name() == "link"
            && element.attr("type").is_some_and(|kind| kind.ends_with(OEMBED_TYPE_SUFFIX))
            && let Some(href) = element.attr("href")
            && !href.is_empty()
        {
            return Some(href.to_string());
        }

        let children: Vec<_> = node.children().collect();
        stack.extend(children.into_iter().rev());
    }

    None
}
