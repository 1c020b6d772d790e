//! `call` command handler
//!
//! Calls a tool through the daemon, starting the daemon first if needed.

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};

use super::CommandContext;
use crate::config::ConfigStore;

/// Parse `key=value` pairs. Values are JSON when they parse as JSON,
/// otherwise plain strings.
pub fn parse_args(pairs: &[String]) -> Result<Map<String, Value>> {
    let mut arguments = Map::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .with_context(|| format!("Invalid argument '{}': expected key=value", pair))?;
        if key.is_empty() {
            bail!("Invalid argument '{}': empty key", pair);
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        arguments.insert(key.to_string(), value);
    }
    Ok(arguments)
}

/// Render a tool result for the terminal
pub fn render_result(result: &Value) -> String {
    let Some(content) = result.get("content").and_then(Value::as_array) else {
        return pretty(result);
    };

    content
        .iter()
        .map(|item| match item.get("type").and_then(Value::as_str) {
            Some("text") => item
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            Some("image") => format!(
                "[Image: {}]",
                item.get("mimeType").and_then(Value::as_str).unwrap_or("unknown")
            ),
            Some("resource") => format!(
                "[Resource: {}]",
                item.pointer("/resource/uri")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
            ),
            _ => pretty(item),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Handle `call <server> <tool> [key=value ...]`
pub async fn run_call(ctx: &CommandContext, server: &str, tool: &str, pairs: &[String]) -> Result<()> {
    let arguments = parse_args(pairs)?;

    if ctx.store().get_server(server)?.is_none() {
        bail!(
            "Server \"{}\" not found in config. Add it with `mcps server add`.",
            server
        );
    }

    let supervisor = ctx.supervisor();
    supervisor.ensure_daemon().await?;

    let result = supervisor
        .client()
        .call_tool(server, tool, Some(Value::Object(arguments)))
        .await?;

    println!("{}", render_result(&result));

    if result.get("isError").and_then(Value::as_bool).unwrap_or(false) {
        bail!("Tool '{}' reported an error", tool);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_values_parse_as_json_or_fall_back_to_strings() {
        let args = parse_args(&[
            "path=/tmp".to_string(),
            "limit=10".to_string(),
            "recursive=true".to_string(),
            "filter={\"ext\":\"rs\"}".to_string(),
            "query=a=b".to_string(),
        ])
        .unwrap();

        assert_eq!(args["path"], json!("/tmp"));
        assert_eq!(args["limit"], json!(10));
        assert_eq!(args["recursive"], json!(true));
        assert_eq!(args["filter"], json!({"ext": "rs"}));
        assert_eq!(args["query"], json!("a=b"));
    }

    #[test]
    fn test_pairs_without_equals_are_rejected() {
        assert!(parse_args(&["oops".to_string()]).is_err());
        assert!(parse_args(&["=value".to_string()]).is_err());
    }

    #[test]
    fn test_render_mixed_content() {
        let result = json!({
            "content": [
                {"type": "text", "text": "hello"},
                {"type": "image", "data": "...", "mimeType": "image/png"},
                {"type": "resource", "resource": {"uri": "file:///a.txt", "text": "x"}}
            ],
            "isError": false
        });

        assert_eq!(
            render_result(&result),
            "hello\n[Image: image/png]\n[Resource: file:///a.txt]"
        );
    }

    #[test]
    fn test_render_without_content_is_pretty_json() {
        let result = json!({"structured": 1});
        assert_eq!(render_result(&result), "{\n  \"structured\": 1\n}");
    }
}
