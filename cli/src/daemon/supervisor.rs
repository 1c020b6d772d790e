//! Daemon supervisor
//!
//! Starting the daemon is a two-phase protocol: re-run the current
//! executable with the hidden `daemon serve` subcommand, then poll
//! `/status` until it reports initialization finished. Hitting the ceiling is
//! not fatal; the caller is told and carries on.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::client::DaemonClient;

const POLL_INTERVAL: Duration = Duration::from_millis(200);
const READY_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of [`Supervisor::ensure_daemon`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// A daemon already answered on the port
    AlreadyRunning,
    /// Spawned and reported fully initialized
    Started,
    /// Spawned, but initialization did not finish before the ceiling
    TimedOut,
}

pub struct Supervisor {
    client: DaemonClient,
    config_path: Option<PathBuf>,
    executable: Option<PathBuf>,
    poll_interval: Duration,
    ready_timeout: Duration,
}

impl Supervisor {
    pub fn new(port: u16, config_path: Option<PathBuf>) -> Self {
        Self {
            client: DaemonClient::new(port),
            config_path,
            executable: None,
            poll_interval: POLL_INTERVAL,
            ready_timeout: READY_TIMEOUT,
        }
    }

    /// Override the readiness polling schedule
    pub fn with_timing(mut self, poll_interval: Duration, ready_timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.ready_timeout = ready_timeout;
        self
    }

    /// Spawn `program` instead of the running executable
    pub fn with_executable(mut self, program: impl Into<PathBuf>) -> Self {
        self.executable = Some(program.into());
        self
    }

    pub fn client(&self) -> &DaemonClient {
        &self.client
    }

    /// Make sure a daemon is answering, starting one if needed
    pub async fn ensure_daemon(&self) -> Result<Readiness> {
        if self.client.is_running().await {
            return Ok(Readiness::AlreadyRunning);
        }
        self.spawn_and_wait().await
    }

    /// Start a background daemon and wait for it to finish initializing
    pub async fn spawn_and_wait(&self) -> Result<Readiness> {
        let port = self.client.port();
        let exe = match &self.executable {
            Some(program) => program.clone(),
            None => std::env::current_exe().context("Failed to locate the mcps executable")?,
        };

        let mut cmd = Command::new(&exe);
        cmd.arg("daemon")
            .arg("serve")
            .arg("--port")
            .arg(port.to_string());
        if let Some(path) = &self.config_path {
            cmd.arg("--config").arg(path);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Detach from our process group so the daemon outlives this command
        #[cfg(unix)]
        cmd.process_group(0);

        tracing::info!("Starting daemon on port {}", port);
        let mut child = cmd.spawn().context("Failed to spawn daemon")?;

        // Relay startup output until the daemon is ready
        let mut relays: Vec<JoinHandle<()>> = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            relays.push(tokio::spawn(async move {
                let _ = relay_lines(stdout, &mut tokio::io::stdout()).await;
            }));
        }
        if let Some(stderr) = child.stderr.take() {
            relays.push(tokio::spawn(async move {
                let _ = relay_lines(stderr, &mut tokio::io::stderr()).await;
            }));
        }

        let readiness = self.poll_ready(Some(&mut child)).await;
        for relay in relays {
            relay.abort();
        }

        let readiness = readiness?;
        if readiness == Readiness::TimedOut {
            tracing::warn!(
                "Daemon did not finish initializing within {}s; continuing anyway",
                self.ready_timeout.as_secs()
            );
        }
        Ok(readiness)
    }

    /// Poll `/status` until it reports `initialized`, the ceiling passes, or
    /// the spawned child exits unsuccessfully
    pub(crate) async fn poll_ready(&self, mut child: Option<&mut Child>) -> Result<Readiness> {
        let deadline = Instant::now() + self.ready_timeout;

        loop {
            match self.client.status().await {
                Ok(status) if status.init.initialized => return Ok(Readiness::Started),
                Ok(_) => tracing::debug!("Daemon is up, still initializing"),
                Err(e) => tracing::debug!("Daemon not ready yet: {}", e),
            }

            if let Some(child) = child.as_deref_mut() {
                if let Some(exit) = child.try_wait().context("Failed to check daemon process")? {
                    if !exit.success() {
                        bail!("Daemon exited during startup ({})", exit);
                    }
                }
            }

            if Instant::now() >= deadline {
                return Ok(Readiness::TimedOut);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Copy `reader` to `writer` line by line with a `[Daemon]` prefix
async fn relay_lines<R, W>(reader: R, writer: &mut W) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        writer
            .write_all(format!("[Daemon] {}\n", line).as_bytes())
            .await?;
        writer.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daemon::{bind, run};
    use crate::mcp::testing::{FakeConnector, MemoryConfigStore};
    use crate::mcp::ConnectionPool;
    use std::sync::Arc;

    async fn free_port() -> u16 {
        let listener = bind(0).await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn test_running_daemon_is_reused() {
        let listener = bind(0).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let pool = Arc::new(ConnectionPool::new(
            Arc::new(MemoryConfigStore::new()),
            Arc::new(FakeConnector::new()),
        ));
        tokio::spawn(run(listener, pool));

        let supervisor = Supervisor::new(port, None);
        assert_eq!(supervisor.ensure_daemon().await.unwrap(), Readiness::AlreadyRunning);
    }

    #[tokio::test]
    async fn test_poll_reports_started_once_initialized() {
        let listener = bind(0).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let pool = Arc::new(ConnectionPool::new(
            Arc::new(MemoryConfigStore::new().with_stdio("slow")),
            Arc::new(FakeConnector::new().delayed("slow", Duration::from_millis(100))),
        ));
        tokio::spawn(run(listener, pool));

        let supervisor = Supervisor::new(port, None)
            .with_timing(Duration::from_millis(20), Duration::from_secs(5));
        assert_eq!(supervisor.poll_ready(None).await.unwrap(), Readiness::Started);
    }

    #[tokio::test]
    async fn test_poll_ceiling_is_a_warning_not_an_error() {
        let supervisor = Supervisor::new(free_port().await, None)
            .with_timing(Duration::from_millis(20), Duration::from_millis(100));

        assert_eq!(supervisor.poll_ready(None).await.unwrap(), Readiness::TimedOut);
    }

    #[tokio::test]
    async fn test_relay_prefixes_each_line() {
        let mut out = Vec::new();
        relay_lines(&b"listening\nready"[..], &mut out).await.unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "[Daemon] listening\n[Daemon] ready\n"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_late_starter_exiting_cleanly_reports_started() {
        // Another process won the port; our child gives up with status 0
        let listener = bind(0).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let pool = Arc::new(ConnectionPool::new(
            Arc::new(MemoryConfigStore::new().with_stdio("A")),
            Arc::new(FakeConnector::new()),
        ));
        tokio::spawn(run(listener, pool));

        let supervisor = Supervisor::new(port, None)
            .with_executable("true")
            .with_timing(Duration::from_millis(20), Duration::from_secs(5));
        assert_eq!(supervisor.spawn_and_wait().await.unwrap(), Readiness::Started);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_spawn_is_an_error() {
        let supervisor = Supervisor::new(free_port().await, None)
            .with_executable("false")
            .with_timing(Duration::from_millis(20), Duration::from_secs(5));

        let err = supervisor.spawn_and_wait().await.unwrap_err();
        assert!(err.to_string().contains("exited during startup"));
    }
}
