use crate::command::CommandSpec;
use crate::error::{Error, Result};
use crate::system::is_elevated;
use crate::task::Context;
use crate::{ExitStatus, OperatingSystemId, RunOptions, TaskKind, SUCCESS};

// Chocolatey reports this when the install only needs a reboot to finish
pub const REBOOT_REQUIRED: ExitStatus = 3010;

const UBUNTU_MIRROR_REWRITE: &str =
    r"s/htt[p|ps]:\/\/archive.ubuntu.com\/ubuntu\//mirror:\/\/mirrors.ubuntu.com\/mirrors.txt/g";
const UBUNTU_BUILD_PACKAGES: [&str; 6] = ["curl", "gcc", "g++", "cmake", "pkg-config", "libssl-dev"];
const RUSTUP_SH: &str =
    "curl --proto '=https' --tlsv1.2 -sSf https://sh.rustup.rs | sh -s -- --profile default -y";
const RUSTUP_INIT_EXE: &str = r"C:\rustup-init.exe";

// One provisioning step
#[derive(Debug, Clone)]
pub struct ProvisionStep {
    pub description: &'static str,
    pub command: CommandSpec,
}

impl ProvisionStep {
    fn new(description: &'static str, command: CommandSpec) -> Self {
        Self {
            description,
            command,
        }
    }
}

// How a system is provisioned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recipe {
    Ubuntu,
    Windows,
}

// Which systems each task can be provisioned on. The tasks disagree on
// purpose: only the unit tests run on Windows.
fn recipe(kind: TaskKind, os: OperatingSystemId) -> Option<Recipe> {
    use OperatingSystemId::{Arch, Macos, Ubuntu, Windows};
    use TaskKind::{CodeQuality, Dependencies, UnitTests};

    match (kind, os) {
        (Dependencies | CodeQuality | UnitTests, Ubuntu) => Some(Recipe::Ubuntu),
        (UnitTests, Windows) => Some(Recipe::Windows),
        (Dependencies | CodeQuality, Windows) => None,
        (_, Macos | Arch) => None,
    }
}

/// Returns the provisioning steps for `kind` on `options.os`, in order.
///
/// # Errors
///
/// Returns [`Error::UnsupportedOs`] if the task cannot be provisioned on the
/// requested operating system.
pub fn plan(kind: TaskKind, options: &RunOptions) -> Result<Vec<ProvisionStep>> {
    let recipe = recipe(kind, options.os).ok_or(Error::UnsupportedOs {
        task: kind,
        os: options.os,
    })?;

    let mut steps = match recipe {
        Recipe::Ubuntu => ubuntu_steps(options.refresh_mirrors),
        Recipe::Windows => windows_steps(),
    };

    if kind == TaskKind::Dependencies {
        let cargo = options.toolchain_dir.join("cargo");
        steps.push(ProvisionStep::new(
            "install cargo-audit",
            CommandSpec::new(cargo.to_string_lossy()).args(["install", "cargo-audit"]),
        ));
    }

    Ok(steps)
}

fn ubuntu_steps(refresh_mirrors: bool) -> Vec<ProvisionStep> {
    let mut steps = Vec::new();

    if refresh_mirrors {
        steps.push(ProvisionStep::new(
            "update package index",
            CommandSpec::new("apt-get").arg("update"),
        ));
        steps.push(ProvisionStep::new(
            "install CA certificates",
            CommandSpec::new("apt-get").args(["install", "-y", "ca-certificates"]),
        ));
        steps.push(ProvisionStep::new(
            "switch to mirror service",
            CommandSpec::new("sed").args(["-i", UBUNTU_MIRROR_REWRITE, "/etc/apt/sources.list"]),
        ));
    }

    steps.push(ProvisionStep::new(
        "update package index",
        CommandSpec::new("apt-get").arg("update"),
    ));
    steps.push(ProvisionStep::new(
        "install build packages",
        CommandSpec::new("apt-get")
            .args(["install", "-y"])
            .args(UBUNTU_BUILD_PACKAGES),
    ));
    steps.push(ProvisionStep::new(
        "install Rust toolchain",
        CommandSpec::new("bash").args(["-c", RUSTUP_SH]),
    ));

    steps
}

fn windows_steps() -> Vec<ProvisionStep> {
    vec![
        ProvisionStep::new(
            "install Visual C++ build tools",
            CommandSpec::new("choco")
                .args(["install", "-y", "visualcpp-build-tools"])
                .accept(REBOOT_REQUIRED),
        ),
        ProvisionStep::new(
            "download rustup",
            CommandSpec::new("powershell").args([
                "-Command".to_string(),
                format!(
                    "Invoke-WebRequest \"https://win.rustup.rs/x86_64\" -OutFile {RUSTUP_INIT_EXE}"
                ),
            ]),
        ),
        ProvisionStep::new(
            "install Rust toolchain",
            CommandSpec::new(RUSTUP_INIT_EXE).args(["--profile", "default", "-y"]),
        ),
    ]
}

// Prepares the machine for a task before its verification command runs
pub struct Provisioner<'a> {
    ctx: Context<'a>,
}

impl<'a> Provisioner<'a> {
    #[must_use]
    pub fn new(ctx: Context<'a>) -> Self {
        Self { ctx }
    }

    /// Provisions `options.os` for `kind`.
    ///
    /// Steps run in order and the first non-zero status is returned right
    /// away; later steps are skipped and earlier ones are not undone.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedOs`] before anything is spawned if the
    /// task has no provisioning recipe for the operating system.
    pub fn setup(&self, kind: TaskKind, options: &RunOptions) -> Result<ExitStatus> {
        let steps = plan(kind, options)?;
        let diagnostics = self.ctx.diagnostics;

        diagnostics.debug(&format!("initializing {} environment...", options.os));
        if self.ctx.runner.spawns()
            && options.os == OperatingSystemId::Ubuntu
            && cfg!(unix)
            && !is_elevated()
        {
            diagnostics.warn("not running as root; apt-get steps will likely fail");
        }

        for step in &steps {
            diagnostics.debug(&format!("{}...", step.description));
            let code = self.ctx.runner.run(&step.command);
            if code != SUCCESS {
                diagnostics.debug(&format!("step '{}' failed with {code}", step.description));
                return Ok(code);
            }
        }

        diagnostics.debug("done initializing environment");
        Ok(SUCCESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(steps: &[ProvisionStep]) -> Vec<String> {
        steps.iter().map(|s| s.command.render()).collect()
    }

    #[test]
    fn test_support_matrix() {
        let supported = |kind, os| plan(kind, &RunOptions::new(os, "/repo")).is_ok();

        assert!(supported(TaskKind::Dependencies, OperatingSystemId::Ubuntu));
        assert!(!supported(TaskKind::Dependencies, OperatingSystemId::Windows));
        assert!(!supported(TaskKind::Dependencies, OperatingSystemId::Macos));
        assert!(!supported(TaskKind::Dependencies, OperatingSystemId::Arch));

        assert!(supported(TaskKind::CodeQuality, OperatingSystemId::Ubuntu));
        assert!(!supported(TaskKind::CodeQuality, OperatingSystemId::Windows));

        assert!(supported(TaskKind::UnitTests, OperatingSystemId::Ubuntu));
        assert!(supported(TaskKind::UnitTests, OperatingSystemId::Windows));
        assert!(!supported(TaskKind::UnitTests, OperatingSystemId::Macos));
        assert!(!supported(TaskKind::UnitTests, OperatingSystemId::Arch));
    }

    #[test]
    fn test_ubuntu_without_refresh() {
        let steps = plan(
            TaskKind::CodeQuality,
            &RunOptions::new(OperatingSystemId::Ubuntu, "/repo"),
        )
        .expect("plan failed");

        assert_eq!(
            rendered(&steps),
            [
                "apt-get update",
                "apt-get install -y curl gcc g++ cmake pkg-config libssl-dev",
                format!("bash -c \"{RUSTUP_SH}\"").as_str(),
            ]
        );
    }

    #[test]
    fn test_ubuntu_with_refresh() {
        let options =
            RunOptions::new(OperatingSystemId::Ubuntu, "/repo").with_refresh_mirrors(true);
        let steps = plan(TaskKind::UnitTests, &options).expect("plan failed");

        assert_eq!(steps.len(), 6);
        assert_eq!(steps[0].command.render(), "apt-get update");
        assert_eq!(
            steps[1].command.render(),
            "apt-get install -y ca-certificates"
        );
        assert_eq!(steps[2].command.program(), "sed");
        assert_eq!(steps[3].command.render(), "apt-get update");
    }

    #[test]
    fn test_dependencies_installs_audit_tool() {
        let options = RunOptions::new(OperatingSystemId::Ubuntu, "/repo")
            .with_toolchain_dir("/opt/cargo/bin");
        let steps = plan(TaskKind::Dependencies, &options).expect("plan failed");

        let last = steps.last().expect("no steps");
        assert_eq!(last.command.render(), "/opt/cargo/bin/cargo install cargo-audit");
    }

    #[test]
    fn test_windows_accepts_reboot_required() {
        let steps = plan(
            TaskKind::UnitTests,
            &RunOptions::new(OperatingSystemId::Windows, "C:\\repo"),
        )
        .expect("plan failed");

        assert_eq!(steps.len(), 3);
        assert!(steps[0].command.is_accepted(REBOOT_REQUIRED));
        assert!(!steps[1].command.is_accepted(REBOOT_REQUIRED));
        assert_eq!(steps[2].command.program(), RUSTUP_INIT_EXE);
    }

    #[test]
    fn test_unsupported_error_names_task_and_os() {
        let err = plan(
            TaskKind::Dependencies,
            &RunOptions::new(OperatingSystemId::Macos, "/repo"),
        )
        .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("audit/dependencies"));
        assert!(message.contains("'macos'"));
    }
}
