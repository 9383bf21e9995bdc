#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde_json::Value;
    use std::process::{Command, Output};

    fn ci_cd(args: &[&str]) -> Result<Output> {
        let output = Command::new(env!("CARGO_BIN_EXE_ci-cd"))
            .args(args)
            .env_remove("CI_CD_OS")
            .env_remove("CI_CD_REPO")
            .env_remove("CI_CD_TOOLCHAIN_DIR")
            .env_remove("RUST_LOG")
            .output()?;
        Ok(output)
    }

    #[test]
    fn test_missing_os_is_a_usage_error() -> Result<()> {
        let output = ci_cd(&["--repo", ".", "ci"])?;
        assert_eq!(output.status.code(), Some(1));
        assert!(!output.stderr.is_empty());
        Ok(())
    }

    #[test]
    fn test_help_exits_cleanly() -> Result<()> {
        let output = ci_cd(&["--help"])?;
        assert_eq!(output.status.code(), Some(0));
        assert!(String::from_utf8(output.stdout)?.contains("--dry-run"));
        Ok(())
    }

    #[test]
    fn test_unsupported_os_fails_dry_run() -> Result<()> {
        let output = ci_cd(&["--os", "macos", "--repo", ".", "--dry-run", "ci"])?;
        assert_eq!(output.status.code(), Some(1));
        assert!(String::from_utf8(output.stderr)?.contains("macos"));
        Ok(())
    }

    #[test]
    fn test_unknown_category_exits_with_usage_error() -> Result<()> {
        let output = ci_cd(&["--os", "ubuntu", "--repo", ".", "--dry-run", "deploy"])?;
        assert_eq!(output.status.code(), Some(1));
        Ok(())
    }

    #[test]
    fn test_windows_json_plan() -> Result<()> {
        let output = ci_cd(&[
            "--os",
            "windows",
            "--repo",
            r"C:\brane",
            "--dry-run",
            "--json",
            "ci",
        ])?;
        assert_eq!(output.status.code(), Some(0));

        // Audit lines go to stderr, so stdout is only the plan
        let plan: Value = serde_json::from_slice(&output.stdout)?;
        let commands = plan.as_array().expect("plan is not an array");
        assert_eq!(commands.len(), 4);

        assert_eq!(commands[0]["argv"][0], "choco");
        let accepted = commands[0]["accepted"].as_array().expect("no accepted codes");
        assert!(accepted.contains(&Value::from(3010)));
        assert_eq!(commands[1]["argv"][0], "powershell");
        assert_eq!(commands[2]["argv"][0], r"C:\rustup-init.exe");

        let argv = commands[3]["argv"].as_array().expect("no argv");
        assert_eq!(argv.len(), 3);
        assert_eq!(argv[0], "cmd");
        assert_eq!(argv[1], "/C");
        let line = argv[2].as_str().expect("line is not a string");
        assert!(line.starts_with("refreshenv && call "));
        assert!(line.ends_with("&& cargo test --all-targets --all-features"));
        assert_eq!(commands[3]["cwd"], r"C:\brane");
        Ok(())
    }

    #[test]
    fn test_dry_run_prints_audit_trail() -> Result<()> {
        let output = ci_cd(&["--os", "ubuntu", "--repo", "/brane", "--dry-run", "ci"])?;
        assert_eq!(output.status.code(), Some(0));

        let stdout = String::from_utf8(output.stdout)?;
        assert!(stdout.contains(" > apt-get update"));
        assert!(stdout.contains(" > cargo test --all-targets --all-features"));
        Ok(())
    }
}
