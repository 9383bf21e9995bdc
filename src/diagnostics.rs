use tracing::{debug, error, warn};

/// Where components report what they are doing.
///
/// Handed to every component explicitly instead of being read from global
/// state, so tests can record what was reported.
pub trait Diagnostics {
    // Audit line printed before a command is spawned
    fn command(&self, rendered: &str);

    fn debug(&self, message: &str);

    fn warn(&self, message: &str);

    fn error(&self, message: &str);
}

// Diagnostics backed by stdout and the tracing subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics {
    debug: bool,
    audit_on_stderr: bool,
}

impl TracingDiagnostics {
    #[must_use]
    pub fn new(debug: bool) -> Self {
        Self {
            debug,
            audit_on_stderr: false,
        }
    }

    // Print the command audit trail to stderr instead of stdout
    #[must_use]
    pub fn audit_on_stderr(mut self) -> Self {
        self.audit_on_stderr = true;
        self
    }
}

impl Diagnostics for TracingDiagnostics {
    fn command(&self, rendered: &str) {
        if self.audit_on_stderr {
            eprintln!(" > {rendered}");
        } else {
            println!(" > {rendered}");
        }
    }

    fn debug(&self, message: &str) {
        if self.debug {
            debug!("{message}");
        }
    }

    fn warn(&self, message: &str) {
        warn!("{message}");
    }

    fn error(&self, message: &str) {
        error!("{message}");
    }
}
