use thiserror::Error;

use super::ConfigError;

/// Failure reported by a plugin fetch strategy.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The server does not offer the schema command; the compat strategy should be tried.
    #[error("schema is not available on the server")]
    NotAvailable,

    #[error("RPC call '{command}' failed: {message}")]
    Rpc { command: String, message: String },

    #[error("malformed plugin metadata: {0}")]
    Malformed(String),
}

impl FetchError {
    pub fn rpc(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rpc {
            command: command.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("failed to finalize RPC client: {0}")]
    Finalize(String),

    #[error("plugin fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
