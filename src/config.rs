use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const DEFAULT_BASEDN: &str = "dc=example,dc=com";

/// Client environment: which server to talk to and how plugin metadata is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Env {
    pub server: String,
    pub in_tree: bool,
    pub force_schema_check: bool,
    /// Overrides the per-user cache root (`$XDG_CACHE_HOME` or `~/.cache`).
    pub cache_dir: Option<PathBuf>,
    pub basedn: String,
}

impl Default for Env {
    fn default() -> Self {
        Self {
            server: String::new(),
            in_tree: false,
            force_schema_check: false,
            cache_dir: None,
            basedn: DEFAULT_BASEDN.to_string(),
        }
    }
}

impl Env {
    pub fn for_server(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            ..Self::default()
        }
    }

    /// Loads an environment from a `.json`, `.yaml` or `.yml` file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::config_file_read_error(path, e.to_string()))?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        match extension.as_str() {
            "json" => serde_json::from_str(&content)
                .map_err(|e| ConfigError::config_parse_error(path, e.to_string())),
            "yaml" | "yml" => serde_yaml::from_str(&content)
                .map_err(|e| ConfigError::config_parse_error(path, e.to_string())),
            other => Err(ConfigError::unsupported_format(other)),
        }
    }

    /// Cache root for this environment, honoring the `cache_dir` override.
    pub fn cache_root(&self) -> Result<PathBuf, ConfigError> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => user_cache_dir(),
        }
    }
}

pub fn user_cache_dir() -> Result<PathBuf, ConfigError> {
    if let Some(xdg) = std::env::var_os("XDG_CACHE_HOME") {
        let xdg = PathBuf::from(xdg);
        // relative values are invalid per the XDG base directory spec
        if xdg.is_absolute() {
            return Ok(xdg);
        }
    }

    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .ok_or(ConfigError::NoCacheDir)?;

    Ok(PathBuf::from(home).join(".cache"))
}
