mod web;

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use oembed_core::{Engine, EngineConfig, StatusPolicy, TableLookup};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "oembed", version, about = "Resolve page URLs to oEmbed data")]
struct Cli {
    #[command(flatten)]
    options: EngineOptions,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct EngineOptions {
    /// Engine configuration file (defaults to OEMBED_CONFIG_PATH or the user config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Provider table replacing the built-in one.
    #[arg(long, global = true)]
    providers: Option<PathBuf>,

    /// Per-request timeout in seconds.
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Treat non-2xx responses as failures instead of decoding their bodies.
    #[arg(long, global = true)]
    strict_status: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch the oEmbed record for a URL and print it as JSON.
    Get {
        url: String,
        /// Print only the embeddable HTML.
        #[arg(long)]
        html: bool,
    },
    /// Print the oEmbed endpoint a URL resolves to.
    Resolve { url: String },
    /// List the provider table in match order.
    Providers {
        /// Also show which provider, if any, handles this URL.
        #[arg(long)]
        check: Option<String>,
    },
    /// Serve the embed web form.
    Serve {
        #[arg(long, env = "PORT", default_value_t = 8080)]
        port: u16,
        #[arg(long, default_value = "0.0.0.0")]
        host: IpAddr,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(matches!(cli.command, Command::Serve { .. }));

    let config = load_engine_config(&cli.options)?;
    let engine = Engine::from_config(&config).context("initialize oembed engine")?;
    debug!(providers = engine.providers().len(), "engine ready");

    let cancel = CancellationToken::new();
    spawn_ctrl_c_handler(cancel.clone());

    match cli.command {
        Command::Get { url, html } => {
            let record = engine.get_embed(&url, &cancel).await?;
            if html {
                println!("{}", web::extract_html(&record).map_err(anyhow::Error::msg)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&record)?);
            }
        }
        Command::Resolve { url } => {
            let endpoint = engine.resolve(&url, &cancel).await?;
            println!("{endpoint}");
        }
        Command::Providers { check } => {
            for pattern in engine.providers() {
                let mode = if pattern.requires_discovery() { "discovery" } else { "endpoint" };
                println!(
                    "{:<24} {:<10} {}  {}",
                    pattern.name(),
                    mode,
                    pattern.matcher().as_str(),
                    pattern.endpoint_template()
                );
            }
            if let Some(url) = check {
                match engine.resolver().lookup(&url) {
                    TableLookup::Endpoint(pattern) => {
                        println!("\n{url}: {} -> {}", pattern.name(), pattern.endpoint_for(&url))
                    }
                    TableLookup::DiscoveryRequired(pattern) => println!("\n{url}: {} (discovery)", pattern.name()),
                    TableLookup::NoMatch => println!("\n{url}: no provider, discovery"),
                }
            }
        }
        Command::Serve { port, host } => {
            web::serve(engine, SocketAddr::new(host, port), cancel).await?;
        }
    }
    Ok(())
}

fn load_engine_config(options: &EngineOptions) -> Result<EngineConfig> {
    let mut config = match &options.config {
        Some(path) => oembed_core::load_config_from_path(path),
        None => oembed_core::load_config(),
    }
    .context("load oembed configuration")?;

    if let Some(path) = &options.providers {
        config.providers_path = Some(path.clone());
    }
    if let Some(timeout) = options.timeout {
        config.timeout_secs = timeout;
    }
    if options.strict_status {
        config.status_policy = StatusPolicy::Strict;
    }
    Ok(config)
}

fn spawn_ctrl_c_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });
}

fn init_tracing(serving: bool) {
    let default_level = if serving { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
