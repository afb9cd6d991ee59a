//! Server setup with Tower middleware

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use http::{HeaderValue, Method, header};
use tempo_reconciler::TimerService;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::auth::TokenVerifier;
use crate::config::ServerConfig;
use crate::error::Error;
use crate::gateway::ConnectionGateway;
use crate::routes;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Task and timer operations
    pub service: TimerService,
    /// Live push connections
    pub gateway: Arc<ConnectionGateway>,
    /// Bearer credential check
    pub verifier: Arc<dyn TokenVerifier>,
}

impl AppState {
    pub fn new(
        service: TimerService,
        gateway: Arc<ConnectionGateway>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        Self {
            service,
            gateway,
            verifier,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service", &self.service)
            .field("gateway", &self.gateway)
            .finish_non_exhaustive()
    }
}

/// Create the application router with middleware.
///
/// # Errors
///
/// Returns an error if the configured CORS origin is not a valid header value.
pub fn create_app(state: AppState, config: &ServerConfig) -> Result<Router, Error> {
    info!("Creating router with CORS origin: {}", config.cors_origin);

    let cors = CorsLayer::new()
        .allow_origin(config.cors_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Ok(routes::create_router().with_state(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(cors),
    ))
}

/// Serve `router` on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the listener fails.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> Result<(), Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("Tempo server listening on {}", addr);
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Tempo server stopped");
    Ok(())
}
