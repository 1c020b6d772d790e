//! HTTP control plane
//!
//! Binds to loopback only. The listener is up before eager initialization
//! starts, so `/status` answers (with `initializing: true`) while servers are
//! still connecting.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::{mpsc, oneshot};
use tower_http::cors::{Any, CorsLayer};

use super::protocol::*;
use crate::error::{ControlError, DaemonError};
use crate::mcp::{ConnectionPool, ToolList};

/// Delay between answering `/stop` and starting shutdown
const STOP_GRACE: Duration = Duration::from_millis(100);

/// How long shutdown waits for in-flight requests before closing anyway
const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Why the control plane stopped accepting requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    StopRequested,
    Signal,
}

/// Shared state handed to every handler
#[derive(Clone)]
pub struct ControlState {
    pub pool: Arc<ConnectionPool>,
    shutdown: mpsc::Sender<ShutdownReason>,
    grace: Duration,
}

impl ControlState {
    pub fn new(pool: Arc<ConnectionPool>, shutdown: mpsc::Sender<ShutdownReason>) -> Self {
        Self {
            pool,
            shutdown,
            grace: STOP_GRACE,
        }
    }
}

/// Build the control-plane router
pub fn router(state: ControlState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/status", get(status).fallback(not_found))
        .route("/call", post(call).fallback(not_found))
        .route("/list", post(list).fallback(not_found))
        .route("/restart", post(restart).fallback(not_found))
        .route("/stop", post(stop).fallback(not_found))
        .fallback(not_found)
        .layer(cors)
        .layer(middleware::from_fn(preflight))
        .with_state(state)
}

/// Answer every OPTIONS request with 204, whatever the path
async fn preflight(request: Request, next: Next) -> Response {
    if request.method() != Method::OPTIONS {
        return next.run(request).await;
    }

    let mut response = StatusCode::NO_CONTENT.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Decode a JSON body; an empty body is the default request
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ControlError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    let parsed = serde_json::from_slice(body).context("Invalid JSON body")?;
    Ok(parsed)
}

async fn status(State(state): State<ControlState>) -> Json<StatusResponse> {
    let init = state.pool.init_status();
    // Probing while initializing would contend with connects in progress
    let connections = state
        .pool
        .active_connection_details(!init.initializing)
        .await;

    Json(StatusResponse {
        status: "running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        connections,
        init,
    })
}

async fn call(
    State(state): State<ControlState>,
    body: Bytes,
) -> Result<Json<CallResponse>, ControlError> {
    let request: CallRequest = parse_body(&body)?;
    let (Some(server), Some(tool)) = (non_empty(request.server), non_empty(request.tool)) else {
        return Err(ControlError::BadRequest("Missing server or tool"));
    };

    let arguments = match request.args {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(_) => return Err(anyhow!("args must be a JSON object").into()),
    };

    let client = state.pool.get_client(&server, None).await?;
    let result = client.call_tool(&tool, arguments).await?;
    Ok(Json(CallResponse { result }))
}

async fn list(
    State(state): State<ControlState>,
    body: Bytes,
) -> Result<Json<ToolList>, ControlError> {
    let request: ListRequest = parse_body(&body)?;
    let server = non_empty(request.server).ok_or(ControlError::BadRequest("Missing server name"))?;

    let client = state.pool.get_client(&server, None).await?;
    let tools = client.list_tools().await?;
    Ok(Json(tools))
}

async fn restart(
    State(state): State<ControlState>,
    body: Bytes,
) -> Result<Json<RestartResponse>, ControlError> {
    let request: RestartRequest = parse_body(&body)?;

    let response = match non_empty(request.server) {
        Some(server) => {
            let closed = state.pool.close_client(&server).await;
            RestartResponse {
                message: format!(
                    "Server \"{}\" connection closed. It will be reconnected on next call.",
                    server
                ),
                closed: Some(closed),
            }
        }
        None => {
            state.pool.close_all().await;
            RestartResponse {
                message: "All connections closed.".to_string(),
                closed: None,
            }
        }
    };
    Ok(Json(response))
}

async fn stop(State(state): State<ControlState>) -> Json<MessageResponse> {
    tracing::info!("Shutdown requested via control plane");

    let shutdown = state.shutdown.clone();
    let grace = state.grace;
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        let _ = shutdown.send(ShutdownReason::StopRequested).await;
    });

    Json(MessageResponse {
        message: "Daemon shutting down...".to_string(),
    })
}

/// Bind the control plane on loopback
pub async fn bind(port: u16) -> Result<TcpListener, DaemonError> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    TcpListener::bind(addr).await.map_err(|source| {
        if source.kind() == std::io::ErrorKind::AddrInUse {
            DaemonError::PortInUse(port)
        } else {
            DaemonError::Bind { port, source }
        }
    })
}

/// Serve the control plane on an already-bound listener until `/stop` or a
/// termination signal, then close every connection.
pub async fn run(listener: TcpListener, pool: Arc<ConnectionPool>) -> Result<()> {
    let (tx, mut rx) = mpsc::channel(1);
    let app = router(ControlState::new(Arc::clone(&pool), tx));

    if let Ok(addr) = listener.local_addr() {
        tracing::info!("MCP daemon listening on http://{}", addr);
    }

    // The socket is already accepting, so status requests succeed meanwhile
    let init_pool = Arc::clone(&pool);
    tokio::spawn(async move {
        init_pool.initialize_all().await;
    });

    let (stopping_tx, stopping_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let reason = tokio::select! {
                received = rx.recv() => received.unwrap_or(ShutdownReason::StopRequested),
                _ = shutdown_signal() => ShutdownReason::Signal,
            };
            tracing::info!("Shutting down ({:?})", reason);
            let _ = stopping_tx.send(());
        })
        .into_future();

    // In-flight requests get a bounded drain; a hung connect or tool call
    // must not keep the daemon alive
    let drain_ceiling = async move {
        if stopping_rx.await.is_err() {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(DRAIN_TIMEOUT).await;
    };

    tokio::select! {
        served = server => served.context("Control plane server error")?,
        _ = drain_ceiling => {
            tracing::warn!(
                "Requests still in flight after {}ms; abandoning them",
                DRAIN_TIMEOUT.as_millis()
            );
        }
    }

    pool.close_all().await;
    tracing::info!("MCP daemon stopped");
    Ok(())
}

/// Bind `port` and run the daemon in the foreground.
///
/// If another daemon already owns the port this returns `Ok(())` so a
/// duplicate start exits cleanly.
pub async fn serve(pool: Arc<ConnectionPool>, port: u16) -> Result<()> {
    let listener = match bind(port).await {
        Ok(listener) => listener,
        Err(DaemonError::PortInUse(port)) => {
            tracing::info!("Port {} is already in use; another daemon is running", port);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    run(listener, pool).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C"),
        _ = terminate => tracing::info!("Received terminate signal"),
    }
}
