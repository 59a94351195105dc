mod config;
mod io;
mod plugin;
mod tracker;

pub use config::ConfigError;
pub use io::IoError;
pub use plugin::{FetchError, PluginError};
pub use tracker::{CommandError, CommandErrorKind, TrackerError};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

pub type Result<T> = std::result::Result<T, Error>;
