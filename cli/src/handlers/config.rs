//! `config` command handlers

use anyhow::Result;

use super::CommandContext;
use crate::cli::ConfigCommands;
use crate::config::JsonConfigStore;

/// Dispatch config subcommands to their handlers
pub fn run_config_command(ctx: &CommandContext, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Import { file, force } => {
            let source = JsonConfigStore::load_from_path(&file)?;
            let report = ctx.store().import(&source, force)?;

            for name in &report.imported {
                println!("Imported {}", name);
            }
            for name in &report.updated {
                println!("Overwrote {}", name);
            }
            for (name, reason) in &report.skipped {
                println!("Skipped {}: {}", name, reason);
            }
            println!(
                "{} imported, {} overwritten, {} skipped -> {}",
                report.imported.len(),
                report.updated.len(),
                report.skipped.len(),
                ctx.config_path.display()
            );
            Ok(())
        }
        ConfigCommands::Path => {
            println!("{}", ctx.config_path.display());
            Ok(())
        }
    }
}
