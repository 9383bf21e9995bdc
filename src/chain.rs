use crate::command::CommandSpec;
use crate::error::{Error, Result};
use crate::OperatingSystemId;

/// Commands that must share one shell process, joined with `&&`.
///
/// Environment activation scripts only affect the shell they run in, so the
/// chain is lowered into a single command for the target system. Quoting
/// happens here and nowhere else.
#[derive(Debug, Clone, Default)]
pub struct CommandChain {
    steps: Vec<CommandSpec>,
}

impl CommandChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn then(mut self, step: CommandSpec) -> Self {
        self.steps.push(step);
        self
    }

    #[must_use]
    pub fn steps(&self) -> &[CommandSpec] {
        &self.steps
    }

    /// Lowers the chain into one command for `os`.
    ///
    /// Windows gets `cmd /C a && b`, every other system `sh -c 'a && b'`. The
    /// working directory, environment and capture flag of the last step (the
    /// command the chain exists for) are carried over.
    ///
    /// Only the Windows unit-test activation uses a chain today; the `sh -c`
    /// lowering keeps the helper usable for any target system.
    ///
    /// # Errors
    ///
    /// Returns an error if the chain is empty or a token cannot be quoted for
    /// the target shell.
    pub fn lower(&self, os: OperatingSystemId) -> Result<CommandSpec> {
        let last = self
            .steps
            .last()
            .ok_or_else(|| Error::InvalidCommand("empty command chain".to_string()))?;

        let lines = self
            .steps
            .iter()
            .map(|step| {
                if os.is_windows() {
                    cmd_line(step)
                } else {
                    sh_line(step)
                }
            })
            .collect::<Result<Vec<_>>>()?;
        let line = lines.join(" && ");

        let mut lowered = if os.is_windows() {
            CommandSpec::new("cmd").args(["/C".to_string(), line]).raw_args()
        } else {
            CommandSpec::new("sh").args(["-c".to_string(), line])
        };

        if let Some(dir) = last.working_dir() {
            lowered = lowered.current_dir(dir);
        }
        if let Some(env) = last.environment() {
            lowered = lowered.env(env.clone());
        }
        Ok(lowered.capture(last.captures_output()))
    }
}

fn sh_line(step: &CommandSpec) -> Result<String> {
    shlex::try_join(step.argv().iter().map(String::as_str))
        .map_err(|e| Error::InvalidCommand(format!("cannot quote '{}': {e}", step.program())))
}

fn cmd_line(step: &CommandSpec) -> Result<String> {
    step.argv()
        .iter()
        .map(|token| cmd_quote(token))
        .collect::<Result<Vec<_>>>()
        .map(|tokens| tokens.join(" "))
}

// cmd.exe has no escape for a double quote inside a quoted token
fn cmd_quote(token: &str) -> Result<String> {
    if token.contains('"') {
        return Err(Error::InvalidCommand(format!(
            "cannot pass '{token}' through cmd.exe"
        )));
    }
    let special = |c: char| c.is_whitespace() || "&|<>^()%!".contains(c);
    if token.is_empty() || token.chars().any(special) {
        Ok(format!("\"{token}\""))
    } else {
        Ok(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activation() -> CommandChain {
        CommandChain::new()
            .then(CommandSpec::new("refreshenv"))
            .then(CommandSpec::new("call").arg(r"C:\Program Files (x86)\vcvars64.bat"))
            .then(
                CommandSpec::new("cargo")
                    .args(["test", "--all-targets"])
                    .current_dir(r"C:\repo"),
            )
    }

    #[test]
    fn test_lower_windows() {
        let cmd = activation().lower(OperatingSystemId::Windows).expect("lower failed");
        assert_eq!(cmd.program(), "cmd");
        assert_eq!(
            cmd.arguments(),
            [
                "/C",
                r#"refreshenv && call "C:\Program Files (x86)\vcvars64.bat" && cargo test --all-targets"#
            ]
        );
        assert!(cmd.has_raw_args());
        assert_eq!(cmd.working_dir(), Some(std::path::Path::new(r"C:\repo")));
    }

    #[test]
    fn test_lower_posix() {
        let chain = CommandChain::new()
            .then(CommandSpec::new("echo").arg("a b"))
            .then(CommandSpec::new("true"));
        let cmd = chain.lower(OperatingSystemId::Ubuntu).expect("lower failed");
        assert_eq!(cmd.argv(), ["sh", "-c", "echo 'a b' && true"]);
        assert!(!cmd.has_raw_args());
    }

    #[test]
    fn test_lower_empty_chain() {
        let err = CommandChain::new().lower(OperatingSystemId::Ubuntu).unwrap_err();
        assert!(matches!(err, Error::InvalidCommand(_)));
    }

    #[test]
    fn test_cmd_rejects_embedded_quote() {
        let chain = CommandChain::new().then(CommandSpec::new("echo").arg("say \"hi\""));
        assert!(chain.lower(OperatingSystemId::Windows).is_err());
    }
}
