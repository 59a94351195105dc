use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IoError {
    #[error("failed to read file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to remove file '{path}': {source}")]
    RemoveError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("'{path}' does not contain a JSON object: {message}")]
    NotAnObject { path: PathBuf, message: String },
}

impl IoError {
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    pub fn write_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WriteError {
            path: path.into(),
            source,
        }
    }

    pub fn remove_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::RemoveError {
            path: path.into(),
            source,
        }
    }

    pub fn not_an_object(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::NotAnObject {
            path: path.into(),
            message: message.into(),
        }
    }

    /// True when the underlying OS error is "file not found".
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::ReadError { source, .. }
            | Self::WriteError { source, .. }
            | Self::RemoveError { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
