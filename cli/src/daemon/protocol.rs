//! Control-plane message bodies
//!
//! JSON shapes exchanged between `mcps` invocations and the daemon. Field
//! names are camelCase on the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mcp::{ConnectionDetail, InitStatus};

/// Body of `POST /call`
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CallRequest {
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub tool: Option<String>,
    /// Tool arguments; must be an object when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
}

/// Body of `POST /list`
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListRequest {
    #[serde(default)]
    pub server: Option<String>,
}

/// Body of `POST /restart`; no server means every connection
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RestartRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
}

/// Reply to `GET /status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub connections: Vec<ConnectionDetail>,
    #[serde(flatten)]
    pub init: InitStatus,
}

/// Reply to `POST /call`
#[derive(Debug, Serialize, Deserialize)]
pub struct CallResponse {
    pub result: Value,
}

/// Reply to `POST /restart`
#[derive(Debug, Serialize, Deserialize)]
pub struct RestartResponse {
    pub message: String,
    /// Whether a connection existed for the named server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed: Option<bool>,
}

/// Plain acknowledgement
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Error body for every non-2xx reply
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Treat empty strings the same as a missing field
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::ConnectionState;
    use serde_json::json;

    #[test]
    fn test_status_flattens_init_flags() {
        let status = StatusResponse {
            status: "running".to_string(),
            version: "0.1.0".to_string(),
            connections: vec![ConnectionDetail {
                name: "a".to_string(),
                tools_count: None,
                status: ConnectionState::Error,
            }],
            init: InitStatus {
                initializing: true,
                initialized: false,
            },
        };

        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({
                "status": "running",
                "version": "0.1.0",
                "connections": [{"name": "a", "toolsCount": null, "status": "error"}],
                "initializing": true,
                "initialized": false
            })
        );
    }

    #[test]
    fn test_restart_omits_closed_for_all() {
        let body = RestartResponse {
            message: "All connections closed.".to_string(),
            closed: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"message": "All connections closed."})
        );
    }

    #[test]
    fn test_empty_strings_count_as_missing() {
        assert_eq!(non_empty(Some(String::new())), None);
        assert_eq!(non_empty(Some("a".to_string())), Some("a".to_string()));
    }
}
