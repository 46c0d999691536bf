//! Minimal web front end: a single URL form that renders the resolved embed.

use std::error::Error;
use std::net::SocketAddr;

use anyhow::{Context, Result, anyhow};
use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use oembed_core::{Engine, OEmbedError, OEmbedRecord};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Default, Deserialize)]
struct EmbedForm {
    #[serde(default)]
    url: String,
}

/// Build the router serving the embed form.
pub fn router(engine: Engine) -> Router {
    Router::new()
        .route("/", get(embed_page))
        .route("/favicon.ico", get(|| async { StatusCode::NOT_FOUND }))
        .with_state(engine)
}

/// Serve the form until `shutdown` is cancelled.
pub async fn serve(engine: Engine, bind_address: SocketAddr, shutdown: CancellationToken) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .with_context(|| format!("bind {bind_address}"))?;
    let bound_address = listener.local_addr()?;
    info!(address = %bound_address, "oembed web form listening");

    axum::serve(listener, router(engine))
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
        })
        .await
        .map_err(|error| anyhow!("web server failed: {error}"))
}

async fn embed_page(State(engine): State<Engine>, Query(form): Query<EmbedForm>) -> Html<String> {
    let target = form.url.trim();
    if target.is_empty() {
        return Html(render_page("", None, None));
    }

    // Cancelled when the client goes away and axum drops this future.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    match engine.get_embed(target, &cancel).await {
        Ok(record) => match extract_html(&record) {
            Ok(markup) => Html(render_page(target, Some(markup), None)),
            Err(message) => Html(render_page(target, None, Some(&message))),
        },
        Err(error) => {
            warn!(url = %target, kind = ?error.kind(), stage = %error.stage(), error = %error, "embed lookup failed");
            Html(render_page(target, None, Some(&failure_report(&error))))
        }
    }
}

/// Embeddable markup of a record, or a description of why there is none.
pub fn extract_html(record: &OEmbedRecord) -> Result<&str, String> {
    if record.html.is_empty() {
        return Err(format!("don't know what to do with data {record:?}"));
    }
    Ok(&record.html)
}

/// Render a failure as its kind, stage and URL followed by the cause chain.
///
/// The error's own message already names its direct source, so the chain
/// starts one level below it.
pub fn failure_report(error: &OEmbedError) -> String {
    let mut report = format!(
        "{:?} failure during {} of {}\n{}",
        error.kind(),
        error.stage(),
        error.url(),
        error
    );
    let mut source = error.source().and_then(|cause| cause.source());
    while let Some(cause) = source {
        report.push_str(&format!("\ncaused by: {cause}"));
        source = cause.source();
    }
    report
}

fn render_page(url: &str, embed: Option<&str>, failure: Option<&str>) -> String {
    let mut page = format!(
        "<html>\n<form><input name=\"url\" placeholder=\"url\" value=\"{}\"></form>\n",
        html_escape::encode_double_quoted_attribute(url)
    );
    if let Some(markup) = embed {
        page.push_str(markup);
        page.push('\n');
    }
    if let Some(message) = failure {
        page.push_str(&format!("<pre>{}</pre>\n", html_escape::encode_text(message)));
    }
    page
}
