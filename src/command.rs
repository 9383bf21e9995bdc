use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::environment::ExecutionEnvironment;
use crate::ExitStatus;

/// One subprocess invocation.
///
/// The program is always the first argument, so a `CommandSpec` is never
/// empty. Builder methods consume the value; once handed to a runner it is
/// not modified.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    argv: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cwd: Option<PathBuf>,
    #[serde(skip)]
    env: Option<ExecutionEnvironment>,
    capture: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    accepted: Vec<ExitStatus>,
    #[serde(skip)]
    raw_args: bool,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            argv: vec![program.into()],
            cwd: None,
            env: None,
            capture: false,
            accepted: Vec::new(),
            raw_args: false,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.argv.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argv.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    #[must_use]
    pub fn env(mut self, env: ExecutionEnvironment) -> Self {
        self.env = Some(env);
        self
    }

    #[must_use]
    pub fn capture(mut self, capture: bool) -> Self {
        self.capture = capture;
        self
    }

    // Extra exit codes that count as success for this command
    #[must_use]
    pub fn accept(mut self, status: ExitStatus) -> Self {
        self.accepted.push(status);
        self
    }

    // Pass the arguments after the program verbatim (Windows `cmd /C` lines)
    #[must_use]
    pub(crate) fn raw_args(mut self) -> Self {
        self.raw_args = true;
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.argv[1..]
    }

    #[must_use]
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    #[must_use]
    pub fn working_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    #[must_use]
    pub fn environment(&self) -> Option<&ExecutionEnvironment> {
        self.env.as_ref()
    }

    #[must_use]
    pub fn captures_output(&self) -> bool {
        self.capture
    }

    #[must_use]
    pub fn has_raw_args(&self) -> bool {
        self.raw_args
    }

    #[must_use]
    pub fn is_accepted(&self, status: ExitStatus) -> bool {
        self.accepted.contains(&status)
    }

    /// Renders the argument list the way it is shown in the audit trail.
    ///
    /// Backslashes and double quotes are escaped with a backslash, and tokens
    /// containing whitespace are wrapped in double quotes. Splitting the
    /// result with POSIX shell rules gives back the original arguments.
    #[must_use]
    pub fn render(&self) -> String {
        self.argv
            .iter()
            .map(|token| quote_token(token))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn quote_token(token: &str) -> String {
    let needs_quotes =
        token.is_empty() || token.starts_with('#') || token.chars().any(char::is_whitespace);

    let mut out = String::with_capacity(token.len() + 2);
    if needs_quotes {
        out.push('"');
    }
    for c in token.chars() {
        match c {
            '\\' | '"' => {
                out.push('\\');
                out.push(c);
            }
            // Only meaningful outside double quotes
            '\'' if !needs_quotes => out.push_str("\\'"),
            _ => out.push(c),
        }
    }
    if needs_quotes {
        out.push('"');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_plain_tokens() {
        let cmd = CommandSpec::new("apt-get").args(["install", "-y", "curl"]);
        assert_eq!(cmd.render(), "apt-get install -y curl");
    }

    #[test]
    fn test_render_quotes_whitespace() {
        let cmd = CommandSpec::new("bash").args(["-c", "echo hi"]);
        assert_eq!(cmd.render(), r#"bash -c "echo hi""#);
    }

    #[test]
    fn test_render_escapes_backslashes_and_quotes() {
        let cmd = CommandSpec::new(r"C:\rustup-init.exe").arg(r#"say "hi""#);
        assert_eq!(cmd.render(), r#"C:\\rustup-init.exe "say \"hi\"""#);
    }

    #[test]
    fn test_render_empty_token() {
        let cmd = CommandSpec::new("echo").arg("");
        assert_eq!(cmd.render(), r#"echo """#);
    }

    #[test]
    fn test_builder_accessors() {
        let cmd = CommandSpec::new("choco")
            .args(["install", "-y"])
            .current_dir("/repo")
            .capture(true)
            .accept(3010);

        assert_eq!(cmd.program(), "choco");
        assert_eq!(cmd.arguments(), ["install", "-y"]);
        assert_eq!(cmd.working_dir(), Some(Path::new("/repo")));
        assert!(cmd.captures_output());
        assert!(cmd.is_accepted(3010));
        assert!(!cmd.is_accepted(1));
        assert!(cmd.environment().is_none());
    }
}
