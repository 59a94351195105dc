/// IPA Remote
///
/// Client-side support for talking to an IPA server's management API: a
/// per-server cache of the plugin metadata the server advertises, selection
/// of the plugin set (in-tree, schema or compat), and trackers that model the
/// expected server state of an entry to check command responses.
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod plugins;
pub mod server_info;
pub mod tracker;

pub use config::Env;
pub use error::{Error, Result};
pub use plugins::{get_package, Api, PluginFetcher, PluginPackage, PluginSource, RpcClient};
pub use server_info::ServerInfo;
pub use tracker::{Command, CommandExecutor, Expected, GroupTracker, Member, Tracker};
