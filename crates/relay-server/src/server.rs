//! `RelayServer`: Axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::Mutex;
use relay_core::{Channel, ConnectionId, Router as EventRouter, SessionRegistry};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::dispatch::{run_dispatcher, RelayInput};
use crate::websocket::hub::ConnectionHub;
use crate::websocket::session::run_ws_session;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<ConnectionHub>,
    pub registry: Arc<SessionRegistry>,
    /// Sender side of the dispatcher queue.
    pub inbound: mpsc::Sender<RelayInput>,
    pub cancel: CancellationToken,
    pub start_time: Instant,
    pub max_send_queue: usize,
    pub max_message_size: usize,
}

/// The relay server. Owns the registry and connection hub for its lifetime.
pub struct RelayServer {
    config: ServerConfig,
    hub: Arc<ConnectionHub>,
    registry: Arc<SessionRegistry>,
    inbound_tx: mpsc::Sender<RelayInput>,
    inbound_rx: Mutex<Option<mpsc::Receiver<RelayInput>>>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    metrics: Option<PrometheusHandle>,
}

/// Background tasks started by [`RelayServer::listen`].
pub struct ServerHandle {
    pub server: JoinHandle<()>,
    pub dispatcher: JoinHandle<()>,
}

impl ServerHandle {
    /// Handles in the order shutdown should await them.
    pub fn into_handles(self) -> Vec<JoinHandle<()>> {
        vec![self.server, self.dispatcher]
    }
}

impl RelayServer {
    /// Create a server with an empty hub and registry.
    pub fn new(config: ServerConfig) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(config.event_queue);
        Self {
            config,
            hub: Arc::new(ConnectionHub::new()),
            registry: Arc::new(SessionRegistry::new()),
            inbound_tx,
            inbound_rx: Mutex::new(Some(inbound_rx)),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
            metrics: None,
        }
    }

    /// Serve `/metrics` from an installed Prometheus recorder.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            hub: self.hub.clone(),
            registry: self.registry.clone(),
            inbound: self.inbound_tx.clone(),
            cancel: self.shutdown.token(),
            start_time: self.start_time,
            max_send_queue: self.config.max_send_queue,
            max_message_size: self.config.max_message_size,
        };

        let mut app = Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler));
        if let Some(handle) = self.metrics.clone() {
            app = app.route(
                "/metrics",
                get(move || {
                    let handle = handle.clone();
                    async move { handle.render() }
                }),
            );
        }

        app.fallback_service(ServeDir::new(&self.config.public_dir))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Start the dispatcher and bind the listener.
    ///
    /// Can be called once; the dispatcher queue has a single consumer.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, ServerHandle)> {
        let Some(inbound_rx) = self.inbound_rx.lock().take() else {
            return Err(std::io::Error::other("relay server is already listening"));
        };

        let channel: Arc<dyn Channel> = self.hub.clone();
        let router = EventRouter::new(self.registry.clone(), channel);
        let cancel = self.shutdown.token();
        let dispatcher = tokio::spawn(run_dispatcher(inbound_rx, router, cancel.clone()));

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr()).await?;
        let local_addr = listener.local_addr()?;
        let app = self.router();

        info!(addr = %local_addr, "relay server started");

        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(cancel.cancelled_owned())
                .await
                .ok();
        });

        Ok((local_addr, ServerHandle { server, dispatcher }))
    }

    /// Get the live connection hub.
    pub fn hub(&self) -> &Arc<ConnectionHub> {
        &self.hub
    }

    /// Get the session registry.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /ws
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let connection_id = ConnectionId::new();
    ws.max_message_size(state.max_message_size)
        .on_upgrade(move |socket| {
            run_ws_session(
                socket,
                connection_id,
                state.hub,
                state.inbound,
                state.max_send_queue,
                state.cancel,
            )
        })
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(state.start_time, &state.hub, &state.registry))
}
