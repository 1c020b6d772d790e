use anyhow::Result;
use clap::Parser;

use mcps::cli::Cli;
use mcps::daemon::default_log_dir;
use mcps::{handlers, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Hold the guard so buffered file logs are flushed on exit
    let _log_guard = if cli.is_daemon_process() {
        logging::init_daemon(cli.verbose, &default_log_dir())
    } else {
        logging::init_cli(cli.verbose)
    };

    handlers::run(cli).await
}
