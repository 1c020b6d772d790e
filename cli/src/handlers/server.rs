//! `server` command handlers
//!
//! Edit the config store. A running daemon picks up changes on the next
//! connect; use `mcps daemon restart <name>` to drop a stale connection.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};

use super::CommandContext;
use crate::cli::server_args::TransportKind;
use crate::cli::ServerCommands;
use crate::config::{ConfigStore, ServerConfig, ServerEntry, ServerUpdate, TransportConfig};

/// Dispatch server subcommands to their handlers
pub fn run_server_command(ctx: &CommandContext, command: ServerCommands) -> Result<()> {
    match command {
        ServerCommands::List => run_list(ctx),
        ServerCommands::Add {
            name,
            kind,
            command,
            args,
            url,
            env,
            disabled,
        } => {
            let mut entry = build_entry(kind, command, args, url, &env)?;
            entry.disabled = disabled;
            ctx.store().add_server(&name, entry)?;
            println!("Added server \"{}\".", name);
            Ok(())
        }
        ServerCommands::Remove { name } => {
            ctx.store().remove_server(&name)?;
            println!("Removed server \"{}\".", name);
            Ok(())
        }
        ServerCommands::Update {
            name,
            command,
            args,
            url,
            enable,
            disable,
        } => {
            let update = ServerUpdate {
                command,
                args,
                url,
                disabled: match (enable, disable) {
                    (true, _) => Some(false),
                    (_, true) => Some(true),
                    _ => None,
                },
            };
            if update.is_empty() {
                bail!("Nothing to update; pass at least one of --command, --args, --url, --enable, --disable");
            }
            ctx.store().update_server(&name, update)?;
            println!("Updated server \"{}\".", name);
            Ok(())
        }
    }
}

/// Parse `KEY=VALUE` environment overrides
pub fn parse_env(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    pairs
        .iter()
        .map(|pair| {
            let (key, value) = pair
                .split_once('=')
                .with_context(|| format!("Invalid env '{}': expected KEY=VALUE", pair))?;
            Ok((key.to_string(), value.to_string()))
        })
        .collect()
}

fn build_entry(
    kind: TransportKind,
    command: Option<String>,
    args: Vec<String>,
    url: Option<String>,
    env: &[String],
) -> Result<ServerEntry> {
    let mut entry = match kind {
        TransportKind::Stdio => {
            let command = command.context("--command is required for stdio servers")?;
            ServerEntry::stdio(command, args)
        }
        TransportKind::Http => {
            let url = url.context("--url is required for http servers")?;
            ServerEntry::http(url)
        }
    };
    entry.env = parse_env(env)?;
    Ok(entry)
}

fn describe(server: &ServerConfig) -> String {
    let target = match &server.transport {
        TransportConfig::Stdio { command, args, .. } if args.is_empty() => command.clone(),
        TransportConfig::Stdio { command, args, .. } => format!("{} {}", command, args.join(" ")),
        TransportConfig::Http { url } => url.clone(),
    };
    let state = if server.disabled { " (disabled)" } else { "" };
    format!(
        "  {} [{}] {}{}",
        server.name,
        server.transport.kind(),
        target,
        state
    )
}

fn run_list(ctx: &CommandContext) -> Result<()> {
    let servers = ctx.store().list_servers()?;
    if servers.is_empty() {
        println!("No servers configured in {}.", ctx.config_path.display());
        println!("Add one with `mcps server add` or `mcps config import`.");
        return Ok(());
    }

    println!("Servers ({}):", servers.len());
    for server in &servers {
        println!("{}", describe(server));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_pairs() {
        let env = parse_env(&["A=1".to_string(), "B=x=y".to_string()]).unwrap();
        assert_eq!(env.get("A").map(String::as_str), Some("1"));
        assert_eq!(env.get("B").map(String::as_str), Some("x=y"));
        assert!(parse_env(&["broken".to_string()]).is_err());
    }

    #[test]
    fn test_stdio_requires_command() {
        let err = build_entry(TransportKind::Stdio, None, Vec::new(), None, &[]).unwrap_err();
        assert!(err.to_string().contains("--command"));
    }

    #[test]
    fn test_http_entry_carries_url() {
        let entry = build_entry(
            TransportKind::Http,
            None,
            Vec::new(),
            Some("http://localhost:8080/mcp".to_string()),
            &[],
        )
        .unwrap();
        assert_eq!(entry.url.as_deref(), Some("http://localhost:8080/mcp"));
        assert_eq!(entry.kind.as_deref(), Some("http"));
    }

    #[test]
    fn test_describe_disabled_stdio() {
        let server = ServerEntry::stdio("npx", vec!["-y".to_string(), "pkg".to_string()])
            .to_server_config("fs")
            .map(|mut s| {
                s.disabled = true;
                s
            })
            .unwrap();
        assert_eq!(describe(&server), "  fs [stdio] npx -y pkg (disabled)");
    }
}
