//! Web layer module
//!
//! Thin HTTP transport over the resolution pipeline. Handlers extract the
//! fingerprint and size, delegate to [`AvatarResolver`], and forward bytes.
//!
//! # Routes
//!
//! - `GET /avatar/:hash`: the avatar for a fingerprint, `?s=` or `?size=` for width
//! - `GET /healthz`: liveness probe
//! - `GET /version`: crate version as JSON

use anyhow::Result;
use axum::{middleware::from_fn, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::info;

use crate::config::WebConfig;
use crate::services::AvatarResolver;

pub mod handlers;
pub mod middleware;

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(state: AppState) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", state.web.host, state.web.port).parse()?;
        let app = create_router(state);
        Ok(Self { app, addr })
    }

    /// Serve until Ctrl-C or SIGTERM
    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<AvatarResolver>,
    pub web: Arc<WebConfig>,
}

impl AppState {
    pub fn new(resolver: Arc<AvatarResolver>, web: WebConfig) -> Self {
        Self {
            resolver,
            web: Arc::new(web),
        }
    }
}

/// Create the router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let version = Router::new()
        .route("/version", get(handlers::version))
        .layer(from_fn(middleware::security_headers_middleware));

    let service = Router::new()
        .route("/healthz", get(handlers::healthz))
        .merge(version)
        .layer(from_fn(middleware::no_cache_headers_middleware));

    Router::new()
        .route("/avatar/:hash", get(handlers::serve_avatar))
        .merge(service)
        // Middleware (applied in reverse order)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping web server");
}
