//! Client for the daemon's control plane
//!
//! Used by every short-lived `mcps` command. Failures are reported as
//! [`DaemonError`] so callers can tell "not running" apart from "rejected".

use std::time::Duration;

use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::base_url;
use super::protocol::*;
use crate::error::DaemonError;
use crate::mcp::ToolList;

/// How long to wait for the TCP connect before calling the daemon unreachable
const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct DaemonClient {
    port: u16,
    base_url: String,
    http: reqwest::Client,
}

impl DaemonClient {
    pub fn new(port: u16) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            port,
            base_url: base_url(port),
            http,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Check if the daemon answers on its port
    pub async fn is_running(&self) -> bool {
        self.status().await.is_ok()
    }

    pub async fn status(&self) -> Result<StatusResponse, DaemonError> {
        let response = self
            .http
            .get(format!("{}/status", self.base_url))
            .send()
            .await
            .map_err(|source| self.unreachable(source))?;
        Self::decode(response).await
    }

    /// Call a tool; returns the protocol's raw result
    pub async fn call_tool(
        &self,
        server: &str,
        tool: &str,
        args: Option<Value>,
    ) -> Result<Value, DaemonError> {
        let request = CallRequest {
            server: Some(server.to_string()),
            tool: Some(tool.to_string()),
            args,
        };
        let response: CallResponse = self.post("/call", &request).await?;
        Ok(response.result)
    }

    pub async fn list_tools(&self, server: &str) -> Result<ToolList, DaemonError> {
        let request = ListRequest {
            server: Some(server.to_string()),
        };
        self.post("/list", &request).await
    }

    /// Close one connection, or all of them when `server` is `None`
    pub async fn restart(&self, server: Option<&str>) -> Result<RestartResponse, DaemonError> {
        let request = RestartRequest {
            server: server.map(str::to_string),
        };
        self.post("/restart", &request).await
    }

    pub async fn stop(&self) -> Result<MessageResponse, DaemonError> {
        self.post("/stop", &serde_json::json!({})).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, DaemonError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(|source| self.unreachable(source))?;
        Self::decode(response).await
    }

    fn unreachable(&self, source: reqwest::Error) -> DaemonError {
        DaemonError::Unreachable {
            port: self.port,
            source,
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, DaemonError> {
        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorResponse>().await {
                Ok(body) => body.error,
                Err(_) => format!("Daemon returned {}", status),
            };
            return Err(DaemonError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        response.json().await.map_err(DaemonError::InvalidResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daemon::{bind, run};
    use crate::mcp::testing::{FakeConnector, MemoryConfigStore};
    use crate::mcp::ConnectionPool;
    use std::sync::Arc;

    async fn start_daemon(store: MemoryConfigStore) -> DaemonClient {
        let pool = Arc::new(ConnectionPool::new(
            Arc::new(store),
            Arc::new(FakeConnector::new()),
        ));
        let listener = bind(0).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(run(listener, pool));
        DaemonClient::new(port)
    }

    #[tokio::test]
    async fn test_unreachable_when_nothing_listens() {
        let port = {
            let listener = bind(0).await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = DaemonClient::new(port);

        assert!(!client.is_running().await);
        let err = client.status().await.unwrap_err();
        assert!(matches!(err, DaemonError::Unreachable { port: p, .. } if p == port));
    }

    #[tokio::test]
    async fn test_round_trip_through_control_plane() {
        let client = start_daemon(MemoryConfigStore::new().with_stdio("A")).await;

        let status = client.status().await.unwrap();
        assert_eq!(status.status, "running");

        let result = client
            .call_tool("A", "echo", Some(serde_json::json!({"message": "hi"})))
            .await
            .unwrap();
        assert_eq!(result["content"][0]["text"], "hi");

        let tools = client.list_tools("A").await.unwrap();
        assert_eq!(tools.tools[0].name, "echo");

        let restarted = client.restart(Some("A")).await.unwrap();
        assert_eq!(restarted.closed, Some(true));

        let stopped = client.stop().await.unwrap();
        assert_eq!(stopped.message, "Daemon shutting down...");
    }

    #[tokio::test]
    async fn test_rejections_carry_daemon_message() {
        let client = start_daemon(MemoryConfigStore::new()).await;

        let err = client.call_tool("ghost", "echo", None).await.unwrap_err();
        match err {
            DaemonError::Rejected { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "Server \"ghost\" not found in config.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
