use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {message}")]
    ConfigFileReadError { path: PathBuf, message: String },

    #[error("failed to parse config file '{path}': {message}")]
    ConfigParseError { path: PathBuf, message: String },

    #[error("unsupported config format: {format} (expected json or yaml)")]
    UnsupportedFormat { format: String },

    #[error("invalid server hostname '{hostname}': {message}")]
    InvalidHostname { hostname: String, message: String },

    #[error("no server configured")]
    MissingServer,

    #[error("could not determine user cache directory: neither XDG_CACHE_HOME nor HOME is set")]
    NoCacheDir,
}

impl ConfigError {
    pub fn config_file_read_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigFileReadError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn config_parse_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn invalid_hostname(hostname: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidHostname {
            hostname: hostname.into(),
            message: message.into(),
        }
    }
}
