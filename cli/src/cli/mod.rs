//! CLI module
//!
//! Argument definitions for clap parsing:
//! - `args`: the top-level [`Cli`] and [`Commands`]
//! - `daemon_args`: `mcps daemon ...`
//! - `server_args`: `mcps server ...` and `mcps config ...`

pub mod args;
pub mod daemon_args;
pub mod server_args;

pub use args::{Cli, Commands};
pub use daemon_args::DaemonCommands;
pub use server_args::{ConfigCommands, ServerCommands};
