//! Daemon start/stop/status command handlers

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use super::{logs, CommandContext};
use crate::cli::DaemonCommands;
use crate::daemon::{self, Readiness, StatusResponse};
use crate::mcp::{ConnectionDetail, ConnectionPool, ConnectionState, RmcpConnector};

/// How long `daemon stop` waits for the port to go quiet
const STOP_WAIT: Duration = Duration::from_secs(3);

/// Dispatch daemon subcommands to their handlers
pub async fn run_daemon_command(ctx: &CommandContext, command: DaemonCommands) -> Result<()> {
    match command {
        DaemonCommands::Start => run_start(ctx).await,
        DaemonCommands::Serve => run_serve(ctx).await,
        DaemonCommands::Stop => run_stop(ctx).await,
        DaemonCommands::Status => run_status(ctx).await,
        DaemonCommands::Restart { server } => run_restart(ctx, server.as_deref()).await,
        DaemonCommands::Logs { lines } => logs::run_logs(lines).await,
    }
}

/// Handle `daemon start`
pub async fn run_start(ctx: &CommandContext) -> Result<()> {
    let supervisor = ctx.supervisor();
    if supervisor.client().is_running().await {
        println!("Daemon is already running on port {}.", ctx.port);
        return Ok(());
    }

    println!("Starting daemon on port {}...", ctx.port);
    match supervisor.spawn_and_wait().await? {
        Readiness::Started | Readiness::AlreadyRunning => {
            println!("Daemon started.");
        }
        Readiness::TimedOut => {
            println!("Daemon started but is still initializing.");
            println!("Check `mcps daemon status` or `mcps daemon logs`.");
        }
    }
    Ok(())
}

/// Handle the hidden `daemon serve`: run the control plane in the foreground
pub async fn run_serve(ctx: &CommandContext) -> Result<()> {
    tracing::info!("Using config {}", ctx.config_path.display());
    let pool = Arc::new(ConnectionPool::new(
        ctx.shared_store(),
        Arc::new(RmcpConnector::new()),
    ));
    daemon::serve(pool, ctx.port).await
}

/// Handle `daemon stop`
pub async fn run_stop(ctx: &CommandContext) -> Result<()> {
    let client = ctx.client();
    if !client.is_running().await {
        println!("Daemon is not running.");
        return Ok(());
    }

    let reply = client.stop().await?;
    println!("{}", reply.message);

    let deadline = tokio::time::Instant::now() + STOP_WAIT;
    while client.is_running().await {
        if tokio::time::Instant::now() >= deadline {
            println!("Daemon is still answering; it may be closing connections.");
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    println!("Daemon stopped.");
    Ok(())
}

fn describe_connection(detail: &ConnectionDetail, initializing: bool) -> String {
    match (detail.status, detail.tools_count) {
        (ConnectionState::Error, _) => format!("  {} [Error]", detail.name),
        (ConnectionState::Connected, Some(count)) => {
            format!("  {} ({} tools)", detail.name, count)
        }
        (ConnectionState::Connected, None) if initializing => {
            format!("  {} (initializing)", detail.name)
        }
        (ConnectionState::Connected, None) => format!("  {}", detail.name),
    }
}

fn render_status(status: &StatusResponse, port: u16) -> Vec<String> {
    let mut out = vec![format!(
        "Daemon running (v{}) on port {}",
        status.version, port
    )];
    if status.init.initializing {
        out.push("Still connecting to servers...".to_string());
    }

    if status.connections.is_empty() {
        out.push("No active connections.".to_string());
    } else {
        out.push(format!("Connections ({}):", status.connections.len()));
        out.extend(
            status
                .connections
                .iter()
                .map(|c| describe_connection(c, status.init.initializing)),
        );
    }
    out
}

/// Handle `daemon status`
pub async fn run_status(ctx: &CommandContext) -> Result<()> {
    let client = ctx.client();
    let status = match client.status().await {
        Ok(status) => status,
        Err(e) => {
            if ctx.is_verbose() {
                tracing::info!("{}", e);
            }
            println!("Daemon is not running.");
            return Ok(());
        }
    };

    for line in render_status(&status, ctx.port) {
        println!("{}", line);
    }
    Ok(())
}

/// Handle `daemon restart [server]`
pub async fn run_restart(ctx: &CommandContext, server: Option<&str>) -> Result<()> {
    let client = ctx.client();
    if !client.is_running().await {
        println!("Daemon is not running.");
        return Ok(());
    }

    let reply = client.restart(server).await?;
    println!("{}", reply.message);
    if reply.closed == Some(false) {
        if let Some(server) = server {
            println!("(\"{}\" had no open connection)", server);
        }
    }
    Ok(())
}
