//! Error taxonomy for the pool, the control plane and the supervisor

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::daemon::ErrorResponse;

/// Failures surfaced by [`crate::mcp::ConnectionPool::get_client`].
///
/// None of these are cached: the next call for the same name starts over.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The name is absent from the config store
    #[error("Server \"{0}\" not found in config.")]
    NotFound(String),

    /// The bounded wait for a connection expired
    #[error("Connection to \"{name}\" timed out after {}ms", timeout.as_millis())]
    ConnectTimeout { name: String, timeout: Duration },

    /// Handshake or I/O failure reported by the transport
    #[error("Failed to connect to \"{name}\": {source:#}")]
    Transport {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// The config store itself could not be read
    #[error("Failed to read server config: {source:#}")]
    Config {
        #[source]
        source: anyhow::Error,
    },
}

/// Errors returned by control-plane handlers
#[derive(Debug, Error)]
pub enum ControlError {
    /// A required request field is missing
    #[error("{0}")]
    BadRequest(&'static str),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ControlError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ControlError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ControlError::Pool(_) | ControlError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ControlError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Control request failed: {}", self);
        }
        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

/// Errors on the CLI side of the control plane
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Another process already owns the control port
    #[error("Port {0} is already in use")]
    PortInUse(u16),

    #[error("Failed to bind control plane on port {port}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// Nothing answered on the control port
    #[error("Daemon is not reachable on port {port}")]
    Unreachable {
        port: u16,
        #[source]
        source: reqwest::Error,
    },

    /// The daemon answered with a non-success status
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid response from daemon")]
    InvalidResponse(#[source] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_request_maps_to_400() {
        let err = ControlError::BadRequest("Missing server or tool");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Missing server or tool");
    }

    #[test]
    fn test_pool_errors_map_to_500() {
        let err = ControlError::from(PoolError::NotFound("ghost".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Server \"ghost\" not found in config.");
    }

    #[test]
    fn test_timeout_message_reports_millis() {
        let err = PoolError::ConnectTimeout {
            name: "slow".to_string(),
            timeout: Duration::from_millis(8000),
        };
        assert_eq!(err.to_string(), "Connection to \"slow\" timed out after 8000ms");
    }

    #[test]
    fn test_transport_message_includes_cause_chain() {
        let source = anyhow::anyhow!("broken pipe").context("handshake failed");
        let err = PoolError::Transport {
            name: "a".to_string(),
            source,
        };
        assert_eq!(
            err.to_string(),
            "Failed to connect to \"a\": handshake failed: broken pipe"
        );
    }
}
