use std::cell::RefCell;
use std::io::{self, Write};
use std::process::{Command, Stdio};

use crate::command::CommandSpec;
use crate::diagnostics::Diagnostics;
use crate::{ExitStatus, SPAWN_FAILURE, SUCCESS, USAGE_ERROR};

/// Runs a single command to completion and reports its exit status.
///
/// Implementations never fail: a command that cannot be started is reported
/// through diagnostics and mapped to [`SPAWN_FAILURE`].
pub trait ProcessRunner {
    fn run(&self, cmd: &CommandSpec) -> ExitStatus;

    // False for runners that only record commands
    fn spawns(&self) -> bool {
        true
    }
}

// Runs commands as real child processes
pub struct SystemRunner<'a> {
    diagnostics: &'a dyn Diagnostics,
}

impl<'a> SystemRunner<'a> {
    #[must_use]
    pub fn new(diagnostics: &'a dyn Diagnostics) -> Self {
        Self { diagnostics }
    }

    fn build(cmd: &CommandSpec) -> Command {
        let mut command = Command::new(cmd.program());

        if cmd.has_raw_args() {
            push_raw_args(&mut command, cmd.arguments());
        } else {
            command.args(cmd.arguments());
        }

        if let Some(dir) = cmd.working_dir() {
            command.current_dir(dir);
        }
        if let Some(env) = cmd.environment() {
            command.env_clear().envs(env.iter());
        }

        if cmd.captures_output() {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        command
    }
}

impl ProcessRunner for SystemRunner<'_> {
    fn run(&self, cmd: &CommandSpec) -> ExitStatus {
        self.diagnostics.command(&cmd.render());

        let mut command = Self::build(cmd);
        let result = if cmd.captures_output() {
            command.output().map(|output| {
                // Captured output is replayed once the child is done
                let replayed = io::stdout()
                    .write_all(&output.stdout)
                    .and_then(|()| io::stderr().write_all(&output.stderr));
                if let Err(e) = replayed {
                    self.diagnostics.warn(&format!(
                        "failed to replay output of '{}': {e}",
                        cmd.program()
                    ));
                }
                output.status
            })
        } else {
            command.status()
        };

        match result {
            Ok(status) => {
                let code = exit_code(status);
                if code != SUCCESS && cmd.is_accepted(code) {
                    self.diagnostics.debug(&format!(
                        "'{}' returned {code}, which is accepted as success",
                        cmd.program()
                    ));
                    SUCCESS
                } else {
                    code
                }
            }
            Err(e) => {
                self.diagnostics
                    .error(&format!("failed to run '{}': {e}", cmd.program()));
                SPAWN_FAILURE
            }
        }
    }
}

#[cfg(windows)]
fn push_raw_args(command: &mut Command, args: &[String]) {
    use std::os::windows::process::CommandExt;
    for arg in args {
        command.raw_arg(arg);
    }
}

#[cfg(not(windows))]
fn push_raw_args(command: &mut Command, args: &[String]) {
    command.args(args);
}

#[cfg(unix)]
fn exit_code(status: std::process::ExitStatus) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(USAGE_ERROR)
}

#[cfg(not(unix))]
fn exit_code(status: std::process::ExitStatus) -> ExitStatus {
    status.code().unwrap_or(USAGE_ERROR)
}

// Records and prints commands without spawning anything
pub struct DryRunRunner<'a> {
    diagnostics: &'a dyn Diagnostics,
    recorded: RefCell<Vec<CommandSpec>>,
}

impl<'a> DryRunRunner<'a> {
    #[must_use]
    pub fn new(diagnostics: &'a dyn Diagnostics) -> Self {
        Self {
            diagnostics,
            recorded: RefCell::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn into_recorded(self) -> Vec<CommandSpec> {
        self.recorded.into_inner()
    }
}

impl ProcessRunner for DryRunRunner<'_> {
    fn run(&self, cmd: &CommandSpec) -> ExitStatus {
        self.diagnostics.command(&cmd.render());
        self.recorded.borrow_mut().push(cmd.clone());
        SUCCESS
    }

    fn spawns(&self) -> bool {
        false
    }
}

// Whether we are running with root privileges (always false off unix)
#[must_use]
pub fn is_elevated() -> bool {
    #[cfg(unix)]
    {
        unsafe { libc::geteuid() == 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}
