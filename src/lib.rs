use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub mod chain;
pub mod command;
pub mod diagnostics;
pub mod dispatcher;
pub mod environment;
pub mod error;
pub mod provision;
pub mod system;
pub mod task;

pub use chain::CommandChain;
pub use command::CommandSpec;
pub use diagnostics::{Diagnostics, TracingDiagnostics};
pub use dispatcher::{Category, Dispatcher};
pub use environment::ExecutionEnvironment;
pub use error::{Error, Result};
pub use provision::{ProvisionStep, Provisioner};
pub use system::{DryRunRunner, ProcessRunner, SystemRunner};
pub use task::{Context, TaskExecutor, VerificationTask};

// Exit status of a command or of the whole run; 0 is success
pub type ExitStatus = i32;

pub const SUCCESS: ExitStatus = 0;
pub const USAGE_ERROR: ExitStatus = 1;
pub const SPAWN_FAILURE: ExitStatus = 127;

// Where rustup puts cargo when the installer runs as root
pub const DEFAULT_TOOLCHAIN_DIR: &str = "/root/.cargo/bin";

/// The operating system the runner is provisioning for.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OperatingSystemId {
    Windows,
    Macos,
    Ubuntu,
    Arch,
}

impl OperatingSystemId {
    pub const ALL: [OperatingSystemId; 4] = [
        OperatingSystemId::Windows,
        OperatingSystemId::Macos,
        OperatingSystemId::Ubuntu,
        OperatingSystemId::Arch,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OperatingSystemId::Windows => "windows",
            OperatingSystemId::Macos => "macos",
            OperatingSystemId::Ubuntu => "ubuntu",
            OperatingSystemId::Arch => "arch",
        }
    }

    #[must_use]
    pub fn is_windows(self) -> bool {
        self == OperatingSystemId::Windows
    }

    // Separator used between entries of the search path variable
    #[must_use]
    pub fn path_separator(self) -> char {
        if self.is_windows() {
            ';'
        } else {
            ':'
        }
    }
}

impl fmt::Display for OperatingSystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperatingSystemId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|os| os.as_str() == s)
            .ok_or_else(|| Error::UnknownOs(s.to_string()))
    }
}

/// The verification tasks the runner knows how to provision for and execute.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Dependencies,
    CodeQuality,
    UnitTests,
}

impl TaskKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            TaskKind::Dependencies => "dependencies",
            TaskKind::CodeQuality => "code_quality",
            TaskKind::UnitTests => "unit_tests",
        }
    }

    // Category the task is registered under by default
    #[must_use]
    pub fn category(self) -> &'static str {
        match self {
            TaskKind::Dependencies | TaskKind::CodeQuality => "audit",
            TaskKind::UnitTests => "ci",
        }
    }

    // Human-readable label used in diagnostics
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            TaskKind::Dependencies => "Dependency audit",
            TaskKind::CodeQuality => "Code quality audit",
            TaskKind::UnitTests => "Unit testing",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// A category plus an optional task; no task means the whole category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub category: String,
    pub task: Option<String>,
}

impl TaskSpec {
    #[must_use]
    pub fn new(category: impl Into<String>, task: Option<&str>) -> Self {
        Self {
            category: category.into(),
            task: task.map(str::to_string),
        }
    }

    #[must_use]
    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            task: None,
        }
    }
}

/// Options shared read-only by every component for a single run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub os: OperatingSystemId,
    pub repo: PathBuf,
    pub refresh_mirrors: bool,
    pub debug: bool,
    pub toolchain_dir: PathBuf,
    pub capture_output: bool,
}

impl RunOptions {
    #[must_use]
    pub fn new(os: OperatingSystemId, repo: impl AsRef<Path>) -> Self {
        Self {
            os,
            repo: repo.as_ref().to_path_buf(),
            refresh_mirrors: false,
            debug: false,
            toolchain_dir: PathBuf::from(DEFAULT_TOOLCHAIN_DIR),
            capture_output: false,
        }
    }

    #[must_use]
    pub fn with_refresh_mirrors(mut self, refresh_mirrors: bool) -> Self {
        self.refresh_mirrors = refresh_mirrors;
        self
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn with_toolchain_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.toolchain_dir = dir.as_ref().to_path_buf();
        self
    }

    #[must_use]
    pub fn with_capture_output(mut self, capture_output: bool) -> Self {
        self.capture_output = capture_output;
        self
    }
}
