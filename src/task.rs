use crate::chain::CommandChain;
use crate::command::CommandSpec;
use crate::diagnostics::Diagnostics;
use crate::environment::ExecutionEnvironment;
use crate::error::Result;
use crate::provision::Provisioner;
use crate::system::ProcessRunner;
use crate::{ExitStatus, OperatingSystemId, RunOptions, TaskKind, SUCCESS};

// Sets up the MSVC toolchain in the shell that runs the tests
const VCVARS64: &str = r"C:\Program Files (x86)\Microsoft Visual Studio\2017\BuildTools\VC\Auxiliary\Build\vcvars64.bat";

/// The capabilities a task runs with.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub runner: &'a dyn ProcessRunner,
    pub diagnostics: &'a dyn Diagnostics,
}

impl<'a> Context<'a> {
    #[must_use]
    pub fn new(runner: &'a dyn ProcessRunner, diagnostics: &'a dyn Diagnostics) -> Self {
        Self {
            runner,
            diagnostics,
        }
    }
}

/// A task that can be registered with the dispatcher.
pub trait TaskExecutor {
    fn name(&self) -> &str;

    /// Runs the task and returns its exit status.
    ///
    /// # Errors
    ///
    /// Returns an error for usage problems detected before anything is
    /// spawned, such as an operating system the task does not support.
    fn execute(&self, ctx: Context<'_>, options: &RunOptions) -> Result<ExitStatus>;
}

/// Provisions the machine, then runs one cargo-based verification command
/// against the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationTask {
    kind: TaskKind,
}

impl VerificationTask {
    #[must_use]
    pub fn new(kind: TaskKind) -> Self {
        Self { kind }
    }

    #[must_use]
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    fn cargo_args(&self) -> &'static [&'static str] {
        match self.kind {
            TaskKind::Dependencies => &["audit"],
            TaskKind::CodeQuality => &[
                "clippy",
                "--all-targets",
                "--all-features",
                "--",
                "-D",
                "warnings",
                "--allow",
                "clippy::manual_range_contains",
            ],
            TaskKind::UnitTests => &["test", "--all-targets", "--all-features"],
        }
    }

    /// Builds the verification command for `options`, starting from the
    /// given ambient environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the Windows activation chain cannot be lowered
    /// into a single command.
    pub fn command(
        &self,
        options: &RunOptions,
        ambient: &ExecutionEnvironment,
    ) -> Result<CommandSpec> {
        let env = ambient.for_toolchain(&options.toolchain_dir, options.os);
        let cargo = CommandSpec::new("cargo")
            .args(self.cargo_args().iter().copied())
            .current_dir(&options.repo)
            .env(env)
            .capture(options.capture_output);

        if self.kind == TaskKind::UnitTests && options.os == OperatingSystemId::Windows {
            CommandChain::new()
                .then(CommandSpec::new("refreshenv"))
                .then(CommandSpec::new("call").arg(VCVARS64))
                .then(cargo)
                .lower(options.os)
        } else {
            Ok(cargo)
        }
    }
}

impl TaskExecutor for VerificationTask {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn execute(&self, ctx: Context<'_>, options: &RunOptions) -> Result<ExitStatus> {
        let code = Provisioner::new(ctx).setup(self.kind, options)?;
        if code != SUCCESS {
            ctx.diagnostics
                .error("failed to prepare environment (see output above)");
            return Ok(code);
        }

        let cmd = self.command(options, &ExecutionEnvironment::ambient())?;
        let code = ctx.runner.run(&cmd);
        if code != SUCCESS {
            ctx.diagnostics.error(&format!(
                "{} failed with return code {code} (see output above)",
                self.kind
            ));
            return Ok(code);
        }

        Ok(SUCCESS)
    }
}
