//! Daemon subcommands

use clap::Subcommand;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum DaemonCommands {
    /// Start the daemon in the background and wait until it is ready
    Start,
    /// Run the daemon in the foreground (used by `start`)
    #[command(hide = true)]
    Serve,
    /// Stop the daemon
    Stop,
    /// Show the daemon's connections
    Status,
    /// Close connections so they reconnect on next use
    Restart {
        /// Only this server (default: all)
        server: Option<String>,
    },
    /// View daemon logs
    Logs {
        /// Number of lines to show (0 = all)
        #[arg(long, short, default_value = "50")]
        lines: usize,
    },
}
