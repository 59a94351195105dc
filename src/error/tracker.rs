use thiserror::Error;

use crate::tracker::expect::Mismatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandErrorKind {
    NotFound,
    Duplicate,
    Validation,
    Other,
}

/// Error returned by a command executor for a failed management command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{command}: {message}")]
pub struct CommandError {
    pub command: String,
    pub kind: CommandErrorKind,
    pub message: String,
}

impl CommandError {
    pub fn new(
        command: impl Into<String>,
        kind: CommandErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            command: command.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(command, CommandErrorKind::NotFound, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == CommandErrorKind::NotFound
    }
}

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("command failed: {0}")]
    Command(#[from] CommandError),

    #[error("unexpected response: {0}")]
    Mismatch(#[from] Mismatch),

    #[error("no member add has been recorded for '{0}'")]
    NoPendingAdd(String),
}
