//! HTTP validation server
//!
//! Thin axum layer over the validation core: one POST endpoint accepting a
//! stored-document key or inline bytes plus the draft record, and a health
//! endpoint. Everything else is the core's concern.

pub mod api;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::backend::BackendClient;
use crate::config::Config;
use crate::error::Result;
use crate::storage::DocumentStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Backend client shared by all requests
    pub client: Arc<BackendClient>,

    /// Read-only document store
    pub store: Arc<DocumentStore>,

    /// Server start time, for health reporting
    pub start_time: Instant,
}

/// Validation HTTP server
pub struct ValidationServer {
    config: Config,
    state: AppState,
}

impl ValidationServer {
    /// Create a new server from configuration
    pub fn new(config: Config) -> Result<Self> {
        let client = Arc::new(BackendClient::new(config.backends.clone())?);
        let store = Arc::new(DocumentStore::new(config.store.root.clone()));

        let state = AppState {
            client,
            store,
            start_time: Instant::now(),
        };

        Ok(Self { config, state })
    }

    /// Get the application state (used by tests to drive handlers directly)
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Bind and serve until the process is stopped
    pub async fn serve(self) -> Result<()> {
        let router = api::create_router(self.state)
            .layer(TraceLayer::new_for_http())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );

        let addr: SocketAddr = format!("{}:{}", self.config.server.host, self.config.server.port)
            .parse()
            .map_err(|e| crate::error::Error::Config(format!("invalid bind address: {e}")))?;

        info!(addr = %addr, "Validation server listening");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}
