use anyhow::{Context as _, Result};
use clap::Parser;
use std::path::PathBuf;

use ci_cd::{
    Context, Dispatcher, DryRunRunner, ExitStatus, OperatingSystemId, RunOptions, SystemRunner,
    TaskSpec, TracingDiagnostics, DEFAULT_TOOLCHAIN_DIR,
};

// CLI arguments parsing structure
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable additional debug prints
    #[arg(long)]
    pub debug: bool,

    /// Operating system to provision for [windows, macos, ubuntu, arch]
    #[arg(long, env = "CI_CD_OS", value_parser = parse_os)]
    pub os: OperatingSystemId,

    /// Path of the repository to run the task against
    #[arg(long, env = "CI_CD_REPO")]
    pub repo: PathBuf,

    /// Switch apt to the mirror service before installing anything
    #[arg(long)]
    pub refresh_mirrors: bool,

    /// Directory the toolchain installer puts cargo in
    #[arg(long, env = "CI_CD_TOOLCHAIN_DIR", default_value = DEFAULT_TOOLCHAIN_DIR)]
    pub toolchain_dir: PathBuf,

    /// Capture command output and print it once the command is done
    #[arg(long)]
    pub capture: bool,

    /// Print the commands that would run without running them
    #[arg(long)]
    pub dry_run: bool,

    /// With --dry-run, print the planned commands as JSON
    #[arg(short = 'j', long, requires = "dry_run")]
    pub json: bool,

    /// Task category (audit, ci)
    pub category: String,

    /// Task within the category; runs the whole category if omitted
    pub task: Option<String>,
}

fn parse_os(value: &str) -> Result<OperatingSystemId, String> {
    value.parse().map_err(|e: ci_cd::Error| e.to_string())
}

impl Cli {
    fn run_options(&self) -> RunOptions {
        RunOptions::new(self.os, &self.repo)
            .with_refresh_mirrors(self.refresh_mirrors)
            .with_debug(self.debug)
            .with_toolchain_dir(&self.toolchain_dir)
            .with_capture_output(self.capture)
    }

    fn task_spec(&self) -> TaskSpec {
        TaskSpec::new(&self.category, self.task.as_deref())
    }
}

// Execute the selected task(s) and return the exit status of the run
pub fn execute_command(cli: &Cli) -> Result<ExitStatus> {
    let options = cli.run_options();
    let spec = cli.task_spec();

    if cli.dry_run {
        return cmd_dry_run(cli, &spec, &options);
    }

    let diagnostics = TracingDiagnostics::new(options.debug);
    let runner = SystemRunner::new(&diagnostics);
    let dispatcher = Dispatcher::with_default_tasks(Context::new(&runner, &diagnostics));
    Ok(dispatcher.dispatch(&spec, &options))
}

fn cmd_dry_run(cli: &Cli, spec: &TaskSpec, options: &RunOptions) -> Result<ExitStatus> {
    // Keep stdout clean for the JSON plan
    let mut diagnostics = TracingDiagnostics::new(options.debug);
    if cli.json {
        diagnostics = diagnostics.audit_on_stderr();
    }

    let runner = DryRunRunner::new(&diagnostics);
    let code =
        Dispatcher::with_default_tasks(Context::new(&runner, &diagnostics)).dispatch(spec, options);

    if cli.json {
        let json = serde_json::to_string_pretty(&runner.into_recorded())
            .context("failed to serialize planned commands to JSON")?;
        println!("{json}");
    }

    Ok(code)
}
