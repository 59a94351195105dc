//! Per-server cache of plugin metadata advertised by the server.
//!
//! Each server gets one JSON object stored at
//! `<cache root>/ipa/servers/<ascii hostname>`. The object is mirrored in
//! memory; the `expiration` and `language` keys decide whether the cached
//! metadata may be reused or the schema must be fetched again.

pub mod hostname;
pub mod locale;

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use crate::config::Env;
use crate::error::{ConfigError, IoError};

pub const DEFAULT_TTL: u64 = 3600;

pub const EXPIRATION_KEY: &str = "expiration";
pub const LANGUAGE_KEY: &str = "language";

pub struct ServerInfo {
    path: PathBuf,
    force_check: bool,
    language: String,
    dict: Map<String, Value>,
}

impl ServerInfo {
    /// Opens the cache entry for `env.server` under the user cache directory.
    pub fn new(env: &Env) -> Result<Self, ConfigError> {
        let root = env.cache_root()?;
        Self::with_cache_dir(env, root)
    }

    pub fn with_cache_dir(env: &Env, cache_root: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let hostname = hostname::to_ascii(&env.server)?;
        let path = servers_dir(cache_root.as_ref()).join(hostname);

        let mut info = Self {
            path,
            force_check: env.force_schema_check,
            language: locale::current_language(),
            dict: Map::new(),
        };
        info.read();
        Ok(info)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Language of the running process, compared against the stored one.
    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.dict
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.dict.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.dict.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.dict.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.dict.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.dict.keys()
    }

    pub fn iter(&self) -> serde_json::map::Iter<'_> {
        self.dict.iter()
    }

    pub fn len(&self) -> usize {
        self.dict.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dict.is_empty()
    }

    /// Stamps a new expiration `ttl` seconds ahead (default one hour) and the
    /// current language, then persists the entry.
    pub fn update_validity(&mut self, ttl: Option<u64>) {
        let ttl = ttl.unwrap_or(DEFAULT_TTL);
        let expiration = now_timestamp() + ttl as f64;
        self.insert(EXPIRATION_KEY, expiration);
        self.insert(LANGUAGE_KEY, self.language.clone());
        self.write();
    }

    pub fn is_valid(&self) -> bool {
        if self.force_check {
            debug!("Schema check forced for {}", self.path.display());
            return false;
        }

        let expiration = self.dict.get(EXPIRATION_KEY).and_then(Value::as_f64);
        let language = self.dict.get(LANGUAGE_KEY).and_then(Value::as_str);
        let (Some(expiration), Some(language)) = (expiration, language) else {
            // an entry without both keys is treated as expired
            return false;
        };

        if expiration < now_timestamp() {
            debug!("Server info expired for {}", self.path.display());
            return false;
        }

        if language != self.language {
            debug!(
                "Language changed from {} to {} since last check",
                language, self.language
            );
            return false;
        }

        true
    }

    /// Persists the current contents. Failures are logged, never returned.
    pub fn flush(&self) {
        self.write();
    }

    /// Forgets all cached data and removes the backing file.
    pub fn clear(&mut self) -> Result<(), IoError> {
        self.dict.clear();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(IoError::remove_error(&self.path, e)),
        }
    }

    fn read(&mut self) {
        match load_map(&self.path) {
            Ok(map) => self.dict = map,
            Err(e) if e.is_not_found() => {
                debug!("No cached server info at {}", self.path.display());
            }
            Err(e) => warn!("Failed to read server info: {e}"),
        }
    }

    fn write(&self) {
        if let Err(e) = store_map(&self.path, &self.dict) {
            warn!("Failed to write server info: {e}");
        }
    }
}

impl<'a> IntoIterator for &'a ServerInfo {
    type Item = (&'a String, &'a Value);
    type IntoIter = serde_json::map::Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.dict.iter()
    }
}

impl std::fmt::Debug for ServerInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerInfo")
            .field("path", &self.path)
            .field("force_check", &self.force_check)
            .field("language", &self.language)
            .field("keys", &self.dict.keys().collect::<Vec<_>>())
            .finish()
    }
}

pub fn servers_dir(cache_root: &Path) -> PathBuf {
    cache_root.join("ipa").join("servers")
}

fn now_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

fn load_map(path: &Path) -> Result<Map<String, Value>, IoError> {
    let content = fs::read_to_string(path).map_err(|e| IoError::read_error(path, e))?;

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(IoError::not_an_object(path, "top-level value is not an object")),
        Err(e) => Err(IoError::not_an_object(path, e.to_string())),
    }
}

fn store_map(path: &Path, map: &Map<String, Value>) -> Result<(), IoError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| IoError::write_error(dir, e))?;
    }

    let content = serde_json::to_string(map)
        .map_err(|e| IoError::write_error(path, std::io::Error::other(e)))?;

    fs::write(path, content).map_err(|e| IoError::write_error(path, e))
}
