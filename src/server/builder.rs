//! ServerBuilder for fluent API to build HTTP servers

use anyhow::Result;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::entity_registry::{EntityDescriptor, EntityRegistry};
use super::state::AppState;

/// Prefix of every API route
pub const API_PREFIX: &str = "/api/v1";

/// Builder for creating the HTTP server
///
/// # Example
///
/// ```ignore
/// let state = AppState::new(Arc::new(InMemoryStore::new()), config);
/// ServerBuilder::new(state)
///     .register(BootcampDescriptor)
///     .serve("127.0.0.1:5000")
///     .await?;
/// ```
pub struct ServerBuilder {
    state: AppState,
    entity_registry: EntityRegistry,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            entity_registry: EntityRegistry::new(),
            custom_routes: Vec::new(),
        }
    }

    /// Register a resource's routes
    pub fn register(mut self, descriptor: impl EntityDescriptor + 'static) -> Self {
        self.entity_registry.register(Box::new(descriptor));
        self
    }

    /// Add routes that are not tied to a resource, relative to the API prefix
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Build the final router
    ///
    /// Every route lives under [`API_PREFIX`]. CORS is permissive and request
    /// logging follows `server.request_logging`.
    pub fn build(self) -> Router {
        let mut api = Router::new()
            .route("/health", get(health_check))
            .merge(self.entity_registry.build_routes(&self.state));
        for custom in self.custom_routes {
            api = api.merge(custom);
        }

        let app = Router::new()
            .nest(API_PREFIX, api)
            .layer(CorsLayer::permissive());

        if self.state.config.server.request_logging {
            app.layer(TraceLayer::new_for_http())
        } else {
            app
        }
    }

    /// Serve the application with graceful shutdown
    ///
    /// This will:
    /// - Bind to the provided address
    /// - Start serving requests
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build();
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "success": true,
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
