use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::process::exit;
use tracing_subscriber::EnvFilter;

mod cli;

use ci_cd::USAGE_ERROR;
use cli::{execute_command, Cli};

fn main() -> Result<()> {
    // Parse command line arguments; usage errors exit with 1
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            // Nothing left to report to if stderr is gone
            e.print().ok();
            exit(USAGE_ERROR);
        }
        Err(e) => e.exit(),
    };

    init_logging(cli.debug)?;

    // Execute the requested task(s) and forward their status
    let code = execute_command(&cli).with_context(|| "command execution failed")?;
    exit(code)
}

// RUST_LOG takes precedence over --debug
fn init_logging(debug: bool) -> Result<()> {
    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!(e))
        .context("failed to initialize logging")
}
