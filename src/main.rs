use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use avatar_proxy::{
    assets::AvatarAssets,
    config::Config,
    directory::LdapDirectory,
    services::{AvatarCache, AvatarResolver, GravatarClient},
    web::{AppState, WebServer},
};

#[derive(Parser)]
#[command(name = "avatar-proxy")]
#[command(version)]
#[command(about = "An avatar proxy serving directory photos with a remote avatar fallback")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with specified level
    let log_filter = if cli.log_level == "trace" {
        format!("avatar_proxy={},tower_http=trace", cli.log_level)
    } else {
        format!("avatar_proxy={}", cli.log_level)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting avatar proxy v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    // Override config with CLI arguments
    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }

    let directory = LdapDirectory::new(config.directory.clone());
    info!(
        "Using directory {}:{} ({:?})",
        config.directory.server,
        config.directory.port,
        directory.mode()
    );

    let mut resolver = AvatarResolver::new(
        AvatarCache::new(),
        Arc::new(directory),
        AvatarAssets::default_avatar()?,
        &config.cache,
    );
    if config.fallback.enabled {
        resolver = resolver.with_remote(Arc::new(GravatarClient::new(&config.fallback)?));
        info!("Remote avatar fallback enabled: {}", config.fallback.url);
    }

    // Warm the cache before serving; an unreachable directory is not fatal
    match resolver.refresh().await {
        Ok(written) => info!(
            "Cache warmed with {} avatar entries ({})",
            written,
            config
                .cache
                .fingerprint_algorithms
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Err(e) => warn!("Initial directory refresh failed: {}", e),
    }

    let web_server = WebServer::new(AppState::new(Arc::new(resolver), config.web))?;

    info!(
        "Starting web server on {}:{}",
        web_server.host(),
        web_server.port()
    );
    web_server.serve().await?;

    Ok(())
}
