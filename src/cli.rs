use anyhow::{Context as AnyhowContext, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;

use crate::config::Env;
use crate::server_info::ServerInfo;

#[derive(Parser, Debug)]
#[command(name = "ipa-server-info")]
#[command(about = "Inspect and maintain the cached plugin metadata of IPA servers", long_about = None)]
pub struct Args {
    /// Config file (JSON or YAML) providing the client environment
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Server hostname (overrides the config file)
    #[arg(short, long, value_name = "HOST")]
    pub server: Option<String>,

    /// Cache root directory (defaults to $XDG_CACHE_HOME or ~/.cache)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Treat cached metadata as stale regardless of its expiration
    #[arg(long)]
    pub force_schema_check: bool,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CacheCommand {
    /// Print the cached entry and whether it is still valid
    Show,
    /// Exit with status 0 if the cached entry is valid, 1 otherwise
    Check,
    /// Stamp a fresh expiration and the current language
    Refresh {
        /// Seconds until the entry expires
        #[arg(long, value_name = "SECONDS")]
        ttl: Option<u64>,
    },
    /// Remove the cached entry
    Clear,
}

impl Args {
    /// Builds the environment from the config file, then applies flag overrides.
    pub fn resolve_env(&self) -> Result<Env> {
        let mut env = match &self.config {
            Some(path) => Env::load(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?,
            None => Env::default(),
        };

        if let Some(server) = &self.server {
            env.server = server.clone();
        }
        if let Some(dir) = &self.cache_dir {
            env.cache_dir = Some(dir.clone());
        }
        if self.force_schema_check {
            env.force_schema_check = true;
        }

        if env.server.trim().is_empty() {
            anyhow::bail!("No server given. Use --server or set `server` in the config file");
        }

        Ok(env)
    }
}

/// Runs `command` and returns whether the process should report success.
pub fn run(command: &CacheCommand, env: &Env) -> Result<bool> {
    let mut info = ServerInfo::new(env)
        .with_context(|| format!("Cannot open server info for {}", env.server))?;

    match command {
        CacheCommand::Show => {
            let report = json!({
                "server": env.server,
                "path": info.path().display().to_string(),
                "valid": info.is_valid(),
                "data": info.as_map(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(true)
        }
        CacheCommand::Check => {
            let valid = info.is_valid();
            println!("{}", if valid { "valid" } else { "stale" });
            Ok(valid)
        }
        CacheCommand::Refresh { ttl } => {
            info.update_validity(*ttl);
            println!("{}", info.path().display());
            Ok(true)
        }
        CacheCommand::Clear => {
            info.clear()
                .with_context(|| format!("Failed to clear {}", info.path().display()))?;
            Ok(true)
        }
    }
}
