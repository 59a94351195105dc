//! Selection of the plugin set used to talk to a server.
//!
//! In-tree mode uses the plugins compiled into the client. Otherwise the set
//! is discovered from the server, first through the schema command and, if
//! the server does not offer it, through the compat command listing. The
//! discovered set is memoized on the [`Api`] so discovery happens once.

use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

use crate::config::Env;
use crate::error::{FetchError, PluginError};
use crate::server_info::ServerInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginSource {
    InTree,
    Schema,
    Compat,
}

impl PluginSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginSource::InTree => "in-tree",
            PluginSource::Schema => "schema",
            PluginSource::Compat => "compat",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginPackage {
    pub source: PluginSource,
    pub version: Option<String>,
    pub fingerprint: Option<String>,
    pub commands: BTreeSet<String>,
}

impl PluginPackage {
    pub fn new<I, S>(source: PluginSource, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source,
            version: None,
            fingerprint: None,
            commands: commands.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains(name)
    }
}

/// Transport used by the fetch strategies.
pub trait RpcClient {
    fn finalize(&mut self) -> Result<(), String>;

    fn connect(&mut self) -> Result<(), String>;

    fn is_connected(&self) -> bool;

    fn disconnect(&mut self);
}

/// Plugin discovery strategies.
pub trait PluginFetcher {
    /// Plugins shipped with the client itself.
    fn in_tree(&self) -> PluginPackage;

    /// Discovers plugins through the server schema. Returns
    /// [`FetchError::NotAvailable`] when the server has no schema support.
    fn fetch_schema(
        &self,
        server_info: &mut ServerInfo,
        client: &mut dyn RpcClient,
    ) -> Result<PluginPackage, FetchError>;

    fn fetch_compat(
        &self,
        server_info: &mut ServerInfo,
        client: &mut dyn RpcClient,
    ) -> Result<PluginPackage, FetchError>;
}

pub struct Api {
    pub env: Env,
    remote_plugins: OnceLock<Arc<PluginPackage>>,
}

impl Api {
    pub fn new(env: Env) -> Self {
        Self {
            env,
            remote_plugins: OnceLock::new(),
        }
    }

    pub fn remote_plugins(&self) -> Option<&Arc<PluginPackage>> {
        self.remote_plugins.get()
    }
}

/// Returns the plugin set for `api`.
///
/// `client_factory` is only called when a remote fetch is needed. The fetch
/// strategies connect the client it builds, and it is disconnected before
/// this function returns, whatever the fetch outcome.
pub fn get_package<F, C>(
    api: &Api,
    fetcher: &F,
    client_factory: C,
) -> Result<Arc<PluginPackage>, PluginError>
where
    F: PluginFetcher + ?Sized,
    C: FnOnce(&Env) -> Box<dyn RpcClient>,
{
    if api.env.in_tree {
        debug!("Using in-tree plugins");
        return Ok(Arc::new(fetcher.in_tree()));
    }

    if let Some(plugins) = api.remote_plugins.get() {
        return Ok(Arc::clone(plugins));
    }

    let mut server_info = ServerInfo::new(&api.env)?;

    let mut client = client_factory(&api.env);
    client.finalize().map_err(PluginError::Finalize)?;

    let outcome = fetch_with_fallback(fetcher, &mut server_info, &mut *client);

    if client.is_connected() {
        client.disconnect();
    }

    let plugins = Arc::new(outcome?);
    info!(
        "Loaded {} plugin commands from {} via {}",
        plugins.commands.len(),
        api.env.server,
        plugins.source.as_str()
    );

    // a concurrent caller may have won the race; keep whichever landed first
    Ok(Arc::clone(api.remote_plugins.get_or_init(|| plugins)))
}

fn fetch_with_fallback<F>(
    fetcher: &F,
    server_info: &mut ServerInfo,
    client: &mut dyn RpcClient,
) -> Result<PluginPackage, FetchError>
where
    F: PluginFetcher + ?Sized,
{
    match fetcher.fetch_schema(server_info, client) {
        Err(FetchError::NotAvailable) => {
            debug!("Schema not available, falling back to compat plugins");
            fetcher.fetch_compat(server_info, client)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_commands() {
        let package = PluginPackage::new(PluginSource::Compat, ["group_add", "group_show"]);
        assert!(package.has_command("group_add"));
        assert!(!package.has_command("user_add"));
        assert_eq!(package.source.as_str(), "compat");
    }

    #[test]
    fn test_api_starts_without_plugins() {
        let api = Api::new(Env::for_server("ipa.example.test"));
        assert!(api.remote_plugins().is_none());
    }
}
