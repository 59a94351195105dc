//! Shared test fixtures: an in-memory group server and scripted plugin
//! discovery collaborators.
#![allow(dead_code)]

use ipa_remote::error::{CommandError, CommandErrorKind, FetchError};
use ipa_remote::plugins::{PluginFetcher, PluginPackage, PluginSource, RpcClient};
use ipa_remote::server_info::ServerInfo;
use ipa_remote::tracker::group::{group_dn, NO_SUCH_ENTRY, POSIXGROUP_OBJECTCLASSES};
use ipa_remote::tracker::{Command, CommandExecutor};
use ipa_remote::Env;
use serde_json::{json, Map, Value};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::rc::Rc;

pub const BASEDN: &str = "dc=example,dc=com";

pub fn env_in(cache_root: &Path) -> Env {
    let mut env = Env::for_server("ipa.example.test");
    env.cache_dir = Some(cache_root.to_path_buf());
    env
}

#[derive(Debug, Clone, Default)]
struct Group {
    gidnumber: Option<String>,
    ipauniqueid: String,
    description: Option<String>,
    member_user: BTreeSet<String>,
    member_group: BTreeSet<String>,
}

/// Answers `group_*` commands the way an IPA server would, from memory.
pub struct FakeGroupServer {
    groups: RefCell<BTreeMap<String, Group>>,
    users: BTreeSet<String>,
    next_gid: Cell<u64>,
    log: RefCell<Vec<Command>>,
}

impl FakeGroupServer {
    pub fn new() -> Self {
        Self {
            groups: RefCell::new(BTreeMap::new()),
            users: BTreeSet::new(),
            next_gid: Cell::new(1_200_001),
            log: RefCell::new(Vec::new()),
        }
    }

    pub fn with_user(mut self, name: &str) -> Self {
        self.users.insert(name.to_string());
        self
    }

    /// Adds a user private group, as created alongside a user entry.
    pub fn with_managed_group(self, name: &str) -> Self {
        let group = self.new_group(false);
        self.groups.borrow_mut().insert(name.to_string(), group);
        self
    }

    pub fn has_group(&self, name: &str) -> bool {
        self.groups.borrow().contains_key(name)
    }

    pub fn commands(&self) -> Vec<Command> {
        self.log.borrow().clone()
    }

    fn new_group(&self, nonposix: bool) -> Group {
        let gidnumber = if nonposix {
            None
        } else {
            let gid = self.next_gid.get();
            self.next_gid.set(gid + 1);
            Some(gid.to_string())
        };
        Group {
            gidnumber,
            ipauniqueid: uuid::Uuid::new_v4().to_string(),
            ..Group::default()
        }
    }

    fn entry(cn: &str, group: &Group, dn: bool, all: bool, description: bool) -> Value {
        let mut entry = Map::new();
        if dn {
            entry.insert("dn".into(), json!(group_dn(cn, BASEDN)));
        }
        entry.insert("cn".into(), json!([cn]));
        if let Some(gid) = &group.gidnumber {
            entry.insert("gidnumber".into(), json!([gid]));
        }
        if !group.member_user.is_empty() {
            entry.insert("member_user".into(), json!(group.member_user));
        }
        if !group.member_group.is_empty() {
            entry.insert("member_group".into(), json!(group.member_group));
        }
        if description {
            if let Some(desc) = &group.description {
                entry.insert("description".into(), json!([desc]));
            }
        }
        if all {
            entry.insert("ipauniqueid".into(), json!([group.ipauniqueid]));
            entry.insert("objectclass".into(), json!(POSIXGROUP_OBJECTCLASSES));
        }
        Value::Object(entry)
    }

    fn not_found(command: &Command, cn: &str) -> CommandError {
        CommandError::not_found(command.name.clone(), format!("{cn}: group not found"))
    }

    fn flag(command: &Command, name: &str) -> bool {
        command.options.get(name).and_then(Value::as_bool).unwrap_or(false)
    }

    fn member_change(&self, command: &Command, cn: &str, add: bool) -> Result<Value, CommandError> {
        let mut groups = self.groups.borrow_mut();
        let known_groups: BTreeSet<String> = groups.keys().cloned().collect();
        let group = groups
            .get_mut(cn)
            .ok_or_else(|| Self::not_found(command, cn))?;

        let mut completed = 0;
        let mut failed_user: Vec<Value> = Vec::new();
        let mut failed_group: Vec<Value> = Vec::new();

        for (kind, known, members, failed) in [
            ("user", &self.users, &mut group.member_user, &mut failed_user),
            ("group", &known_groups, &mut group.member_group, &mut failed_group),
        ] {
            let Some(name) = command.options.get(kind).and_then(Value::as_str) else {
                continue;
            };
            if add {
                if !known.contains(name) {
                    failed.push(json!([name, NO_SUCH_ENTRY]));
                } else if !members.insert(name.to_string()) {
                    failed.push(json!([name, "This entry is already a member"]));
                } else {
                    completed += 1;
                }
            } else if members.remove(name) {
                completed += 1;
            } else {
                failed.push(json!([name, "This entry is not a member"]));
            }
        }

        Ok(json!({
            "completed": completed,
            "failed": {"member": {"group": failed_group, "user": failed_user}},
            "result": Self::entry(cn, group, true, false, true),
        }))
    }
}

impl Default for FakeGroupServer {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandExecutor for FakeGroupServer {
    fn execute(&self, command: &Command) -> Result<Value, CommandError> {
        self.log.borrow_mut().push(command.clone());

        let cn = command
            .args
            .first()
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        match command.name.as_str() {
            "group_add" => {
                if self.has_group(&cn) {
                    return Err(CommandError::new(
                        command.name.clone(),
                        CommandErrorKind::Duplicate,
                        format!("group with name \"{cn}\" already exists"),
                    ));
                }
                let group = self.new_group(Self::flag(command, "nonposix"));
                let entry = Self::entry(&cn, &group, true, true, true);
                self.groups.borrow_mut().insert(cn.clone(), group);
                Ok(json!({
                    "value": cn,
                    "summary": format!("Added group \"{cn}\""),
                    "result": entry,
                }))
            }
            "group_del" => {
                if self.groups.borrow_mut().remove(&cn).is_none() {
                    return Err(Self::not_found(command, &cn));
                }
                Ok(json!({
                    "value": [cn],
                    "summary": format!("Deleted group \"{cn}\""),
                    "result": {"failed": []},
                }))
            }
            "group_show" => {
                let groups = self.groups.borrow();
                let group = groups.get(&cn).ok_or_else(|| Self::not_found(command, &cn))?;
                Ok(json!({
                    "value": cn,
                    "summary": null,
                    "result": Self::entry(&cn, group, true, Self::flag(command, "all"), false),
                }))
            }
            "group_find" => {
                let all = Self::flag(command, "all");
                let groups = self.groups.borrow();
                let found: Vec<Value> = groups
                    .iter()
                    .filter(|(name, _)| cn.is_empty() || name.contains(cn.as_str()))
                    .map(|(name, group)| Self::entry(name, group, true, all, false))
                    .collect();
                let count = found.len();
                let noun = if count == 1 { "group" } else { "groups" };
                Ok(json!({
                    "count": count,
                    "truncated": false,
                    "summary": format!("{count} {noun} matched"),
                    "result": found,
                }))
            }
            "group_mod" => {
                let mut groups = self.groups.borrow_mut();
                let group = groups
                    .get_mut(&cn)
                    .ok_or_else(|| Self::not_found(command, &cn))?;
                for (key, value) in &command.options {
                    match key.as_str() {
                        "description" => group.description = value.as_str().map(str::to_string),
                        "gidnumber" => {
                            group.gidnumber = value
                                .as_u64()
                                .map(|gid| gid.to_string())
                                .or_else(|| value.as_str().map(str::to_string))
                        }
                        _ => {}
                    }
                }
                Ok(json!({
                    "value": cn,
                    "summary": format!("Modified group \"{cn}\""),
                    "result": Self::entry(&cn, group, false, false, true),
                }))
            }
            "group_add_member" => self.member_change(command, &cn, true),
            "group_remove_member" => self.member_change(command, &cn, false),
            "group_detach" => {
                if !self.has_group(&cn) {
                    return Err(Self::not_found(command, &cn));
                }
                Ok(json!({
                    "value": cn,
                    "summary": format!("Detached group \"{cn}\" from user \"{cn}\""),
                    "result": true,
                }))
            }
            other => Err(CommandError::new(
                other,
                CommandErrorKind::Other,
                "unknown command",
            )),
        }
    }
}

/// What the scripted fetcher does on the schema path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaBehavior {
    Succeed,
    NotAvailable,
    Fail,
}

#[derive(Debug, Default)]
pub struct ClientLog {
    pub finalized: bool,
    pub connected: bool,
    pub connects: usize,
    pub disconnects: usize,
}

pub struct FakeClient {
    log: Rc<RefCell<ClientLog>>,
    fail_finalize: bool,
}

impl FakeClient {
    pub fn new(log: Rc<RefCell<ClientLog>>) -> Self {
        Self {
            log,
            fail_finalize: false,
        }
    }

    pub fn failing_finalize(log: Rc<RefCell<ClientLog>>) -> Self {
        Self {
            log,
            fail_finalize: true,
        }
    }
}

impl RpcClient for FakeClient {
    fn finalize(&mut self) -> Result<(), String> {
        if self.fail_finalize {
            return Err("no xmlrpc_uri configured".to_string());
        }
        self.log.borrow_mut().finalized = true;
        Ok(())
    }

    fn connect(&mut self) -> Result<(), String> {
        let mut log = self.log.borrow_mut();
        log.connected = true;
        log.connects += 1;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.log.borrow().connected
    }

    fn disconnect(&mut self) {
        let mut log = self.log.borrow_mut();
        log.connected = false;
        log.disconnects += 1;
    }
}

pub struct ScriptedFetcher {
    pub schema: SchemaBehavior,
    pub calls: RefCell<Vec<&'static str>>,
}

impl ScriptedFetcher {
    pub fn new(schema: SchemaBehavior) -> Self {
        Self {
            schema,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }
}

impl PluginFetcher for ScriptedFetcher {
    fn in_tree(&self) -> PluginPackage {
        self.calls.borrow_mut().push("in_tree");
        PluginPackage::new(PluginSource::InTree, ["group_add", "group_show", "user_add"])
    }

    fn fetch_schema(
        &self,
        server_info: &mut ServerInfo,
        client: &mut dyn RpcClient,
    ) -> Result<PluginPackage, FetchError> {
        self.calls.borrow_mut().push("schema");
        client.connect().map_err(|e| FetchError::rpc("schema", e))?;

        match self.schema {
            SchemaBehavior::Succeed => {
                server_info.insert("fingerprint", "4f1b4c38");
                server_info.insert("version", "2.170");
                server_info.update_validity(None);

                let mut package =
                    PluginPackage::new(PluginSource::Schema, ["group_add", "group_show"]);
                package.fingerprint = Some("4f1b4c38".to_string());
                package.version = Some("2.170".to_string());
                Ok(package)
            }
            SchemaBehavior::NotAvailable => Err(FetchError::NotAvailable),
            SchemaBehavior::Fail => Err(FetchError::rpc("schema", "internal error")),
        }
    }

    fn fetch_compat(
        &self,
        _server_info: &mut ServerInfo,
        client: &mut dyn RpcClient,
    ) -> Result<PluginPackage, FetchError> {
        self.calls.borrow_mut().push("compat");
        client.connect().map_err(|e| FetchError::rpc("env", e))?;
        Ok(PluginPackage::new(PluginSource::Compat, ["group_add"]))
    }
}
