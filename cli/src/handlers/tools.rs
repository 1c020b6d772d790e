//! `tools` command handler
//!
//! Lists a server's tools through the daemon.

use anyhow::Result;
use serde_json::Value;

use super::CommandContext;
use crate::mcp::ToolInfo;

/// One line per argument: name, type, required marker and description
fn describe_arguments(tool: &ToolInfo) -> Vec<String> {
    let Some(properties) = tool.input_schema.get("properties").and_then(Value::as_object) else {
        return Vec::new();
    };
    let required: Vec<&str> = tool
        .input_schema
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut properties: Vec<_> = properties.iter().collect();
    properties.sort_by(|a, b| a.0.cmp(b.0));

    properties
        .into_iter()
        .map(|(name, schema)| {
            let kind = schema.get("type").and_then(Value::as_str).unwrap_or("any");
            let marker = if required.contains(&name.as_str()) { "*" } else { "" };
            match schema.get("description").and_then(Value::as_str) {
                Some(desc) => format!("{}{} ({}): {}", name, marker, kind, desc),
                None => format!("{}{} ({})", name, marker, kind),
            }
        })
        .collect()
}

/// Render a tool listing
pub fn render_tools(server: &str, tools: &[ToolInfo], simple: bool) -> Vec<String> {
    if simple {
        return tools.iter().map(|t| t.name.clone()).collect();
    }
    if tools.is_empty() {
        return vec![format!("No tools found on {}.", server)];
    }

    let mut out = vec![format!("=== {} ({} tools) ===", server, tools.len())];
    for tool in tools {
        let desc = tool
            .description
            .as_deref()
            .unwrap_or("No description")
            .lines()
            .next()
            .unwrap_or("");
        out.push(format!("  {} - {}", tool.name, desc));
        out.extend(
            describe_arguments(tool)
                .into_iter()
                .map(|line| format!("      {}", line)),
        );
    }
    out
}

/// Handle `tools <server> [--simple]`
pub async fn run_tools(ctx: &CommandContext, server: &str, simple: bool) -> Result<()> {
    let supervisor = ctx.supervisor();
    supervisor.ensure_daemon().await?;

    let list = supervisor.client().list_tools(server).await?;
    for line in render_tools(server, &list.tools, simple) {
        println!("{}", line);
    }
    Ok(())
}
