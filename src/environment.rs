use std::collections::BTreeMap;
use std::env;
use std::ffi::{OsStr, OsString};
use std::path::Path;

use crate::OperatingSystemId;

pub const PATH_VAR: &str = "PATH";

/// A full environment for a child process.
///
/// Built from a snapshot of the ambient environment; composing a new
/// environment always copies, so the snapshot it came from is left as is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionEnvironment {
    vars: BTreeMap<OsString, OsString>,
}

impl ExecutionEnvironment {
    // Snapshot of the current process environment
    #[must_use]
    pub fn ambient() -> Self {
        Self::from_vars(env::vars_os())
    }

    #[must_use]
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    #[must_use]
    pub fn get(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
        self.vars.get(key.as_ref()).map(OsString::as_os_str)
    }

    #[must_use]
    pub fn search_path(&self) -> Option<&OsStr> {
        self.get(PATH_VAR)
    }

    /// Returns a copy with `key` set to `value`.
    #[must_use]
    pub fn with_var(&self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        let mut vars = self.vars.clone();
        vars.insert(key.into(), value.into());
        Self { vars }
    }

    /// Returns a copy whose `PATH` ends with `dir`, joined with the separator
    /// of the target operating system.
    #[must_use]
    pub fn with_path_appended(&self, dir: &Path, os: OperatingSystemId) -> Self {
        let value = match self.search_path() {
            Some(current) if !current.is_empty() => {
                let mut value = current.to_os_string();
                value.push(os.path_separator().to_string());
                value.push(dir.as_os_str());
                value
            }
            _ => dir.as_os_str().to_os_string(),
        };
        self.with_var(PATH_VAR, value)
    }

    /// The environment a task's verification command runs with.
    ///
    /// Windows relies on the installers having registered the toolchain, so
    /// only the other systems get the toolchain directory on their path.
    #[must_use]
    pub fn for_toolchain(&self, dir: &Path, os: OperatingSystemId) -> Self {
        if os.is_windows() {
            self.clone()
        } else {
            self.with_path_appended(dir, os)
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
