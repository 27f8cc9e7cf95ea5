//! `RelayServer`: axum host for the hub.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::error::{ServerError, display_addr};
use crate::health::{self, HealthResponse};
use crate::metrics;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::heartbeat::run_liveness_monitor;
use crate::websocket::hub::Hub;
use crate::websocket::session::run_ws_session;

/// Shared state accessible from axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// The relay hub.
    pub hub: Arc<Hub>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle for `/metrics`.
    pub metrics_handle: PrometheusHandle,
    /// Connection limit for `/ws`.
    pub max_connections: usize,
    /// Max inbound message size for `/ws`.
    pub max_message_size: usize,
}

/// The relay server.
pub struct RelayServer {
    config: ServerConfig,
    hub: Arc<Hub>,
    shutdown: Arc<ShutdownCoordinator>,
    metrics_handle: PrometheusHandle,
    start_time: Instant,
}

impl RelayServer {
    /// Create a new server.
    pub fn new(config: ServerConfig, metrics_handle: PrometheusHandle) -> Self {
        let hub = Arc::new(Hub::new(config.send_queue_capacity));
        Self {
            config,
            hub,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            metrics_handle,
            start_time: Instant::now(),
        }
    }

    /// Build the axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            hub: self.hub.clone(),
            start_time: self.start_time,
            metrics_handle: self.metrics_handle.clone(),
            max_connections: self.config.max_connections,
            max_message_size: self.config.max_message_size,
        };

        let router = Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(state);

        let router = match &self.config.static_dir {
            Some(dir) => router.fallback_service(ServeDir::new(dir)),
            None => router,
        };

        router
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Bind, serve and start the liveness monitor.
    ///
    /// Returns the bound address and a handle that completes once the server
    /// has shut down (see [`RelayServer::shutdown`]).
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        let bind_addr = display_addr(&self.config.host, self.config.port);
        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port))
            .await
            .map_err(|e| ServerError::bind(bind_addr, e))?;
        let addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

        let token = self.shutdown.token();
        let monitor = run_liveness_monitor(
            self.hub.clone(),
            self.config.heartbeat_interval,
            token.clone(),
        );
        self.shutdown.track(tokio::spawn(async move {
            let _ = monitor.await;
        }));

        let router = self.router();
        let hub = self.hub.clone();
        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    token.cancelled().await;
                    let _ = hub.close_all();
                })
                .await;
            if let Err(e) = served {
                error!(error = %e, "server error");
            }
            info!("relay server stopped");
        });

        info!(%addr, static_dir = ?self.config.static_dir, "relay server listening");
        Ok((addr, handle))
    }

    /// The hub.
    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// The shutdown coordinator. Stopping it ends the server and closes
    /// every peer; the liveness monitor is tracked there and joined by
    /// [`ShutdownCoordinator::drain`].
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// The server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /ws
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    // The slot is taken before the upgrade so concurrent handshakes cannot
    // overshoot the limit.
    let Some((connection, send_rx)) = state.hub.try_connect(state.max_connections) else {
        ::metrics::counter!(metrics::WS_REJECTED_TOTAL).increment(1);
        warn!(max = state.max_connections, "connection limit reached, refusing upgrade");
        return (StatusCode::SERVICE_UNAVAILABLE, "too many connections").into_response();
    };
    let failed_hub = state.hub.clone();
    let failed_id = connection.id.clone();
    let hub = state.hub.clone();
    ws.max_message_size(state.max_message_size)
        .on_failed_upgrade(move |e| {
            warn!(error = %e, "websocket upgrade failed");
            let _ = failed_hub.disconnect(&failed_id);
        })
        .on_upgrade(move |socket| run_ws_session(socket, hub, connection, send_rx))
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(state.start_time, &state.hub))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render(&state.metrics_handle),
    )
}
