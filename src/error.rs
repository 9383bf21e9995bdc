use thiserror::Error;

use crate::{ExitStatus, OperatingSystemId, TaskKind, USAGE_ERROR};

// Errors detected before any subprocess is spawned
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("unknown category '{category}' (expected one of: {known})")]
    UnknownCategory { category: String, known: String },

    #[error("unknown {category} task '{task}' (expected one of: {known})")]
    UnknownTask {
        category: String,
        task: String,
        known: String,
    },

    #[error(
        "{task} ({}/{}) is not implemented for the '{os}' operating system",
        .task.category(),
        .task.name()
    )]
    UnsupportedOs { task: TaskKind, os: OperatingSystemId },

    #[error("unsupported OS string '{0}'")]
    UnknownOs(String),

    #[error("invalid command: {0}")]
    InvalidCommand(String),
}

impl Error {
    // Every variant is a usage error
    #[must_use]
    pub fn exit_status(&self) -> ExitStatus {
        USAGE_ERROR
    }
}

pub type Result<T> = std::result::Result<T, Error>;
