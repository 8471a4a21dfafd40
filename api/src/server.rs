//! Axum server assembly.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use metavote_relay::RelayService;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use crate::handlers;

/// Build the full route table for a wired service.
pub fn router(service: Arc<RelayService>) -> Router {
    let cors = cors_layer(&service.config().cors_origin);

    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .route("/relayer-address", get(handlers::relayer_address))
        .route("/vote/public", post(handlers::public_vote))
        .route("/vote/private", post(handlers::private_vote))
        .route("/deposits/:contract_type/:address", get(handlers::deposits))
        .route("/polls/:contract_type", get(handlers::list_polls))
        .route("/polls/:contract_type/:poll_id", get(handlers::poll_details));

    if service.config().enable_metrics {
        router = router.route("/metrics", get(handlers::metrics));
    }

    router.layer(cors).with_state(service)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = if origin == "*" {
        AllowOrigin::any()
    } else {
        match origin.parse::<HeaderValue>() {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                warn!(%origin, "invalid CORS origin, falling back to any");
                AllowOrigin::any()
            }
        }
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// The HTTP server for one relay service.
pub struct ApiServer {
    service: Arc<RelayService>,
}

impl ApiServer {
    pub fn new(service: Arc<RelayService>) -> Self {
        Self { service }
    }

    /// Bind and serve until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.service.config().listen_port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(%addr, "HTTP API listening");

        axum::serve(listener, router(self.service))
            .with_graceful_shutdown(async move {
                shutdown.await;
                info!("HTTP API shutting down");
            })
            .await
    }
}
