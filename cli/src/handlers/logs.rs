//! Daemon logs command handler

use anyhow::Result;

use crate::daemon::default_log_dir;
use crate::logging::latest_log_file;

/// Last `lines` lines of `content` (all of them for 0)
fn tail(content: &str, lines: usize) -> Vec<&str> {
    let all: Vec<&str> = content.lines().collect();
    if lines == 0 {
        return all;
    }
    let start = all.len().saturating_sub(lines);
    all[start..].to_vec()
}

/// Handle the `daemon logs` command
pub async fn run_logs(lines: usize) -> Result<()> {
    let log_dir = default_log_dir();
    let Some(log_file) = latest_log_file(&log_dir) else {
        println!("No daemon logs found.");
        println!("Expected location: {}", log_dir.display());
        return Ok(());
    };

    println!("=== Daemon log ({}) ===\n", log_file.display());
    let content = tokio::fs::read_to_string(&log_file).await?;
    for line in tail(&content, lines) {
        println!("{}", line);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_keeps_last_lines() {
        let content = "a\nb\nc\nd";
        assert_eq!(tail(content, 2), vec!["c", "d"]);
        assert_eq!(tail(content, 10), vec!["a", "b", "c", "d"]);
        assert_eq!(tail(content, 0).len(), 4);
        assert!(tail("", 5).is_empty());
    }
}
