//! Tracker for group entries (`group_*` commands).

use serde_json::{Map, Value};

use super::{Command, Expected, Tracker, TrackerState};
use crate::config::{Env, DEFAULT_BASEDN};
use crate::error::TrackerError;

pub const RETRIEVE_KEYS: &[&str] = &["dn", "cn", "gidnumber", "member_user", "member_group"];

pub const RETRIEVE_ALL_KEYS: &[&str] = &[
    "dn",
    "cn",
    "gidnumber",
    "member_user",
    "member_group",
    "ipauniqueid",
    "objectclass",
];

pub const CREATE_KEYS: &[&str] = RETRIEVE_ALL_KEYS;

pub const UPDATE_KEYS: &[&str] = &["cn", "gidnumber", "member_user", "member_group"];

pub const ADD_MEMBER_KEYS: &[&str] = &[
    "dn",
    "cn",
    "gidnumber",
    "member_user",
    "member_group",
    "description",
];

pub const POSIXGROUP_OBJECTCLASSES: &[&str] = &[
    "top",
    "groupofnames",
    "nestedgroup",
    "ipausergroup",
    "ipaobject",
    "posixgroup",
];

pub const CONTAINER_GROUP: &str = "cn=groups,cn=accounts";

pub const NO_SUCH_ENTRY: &str = "no such entry";

pub fn group_dn(name: &str, basedn: &str) -> String {
    format!("cn={name},{CONTAINER_GROUP},{basedn}")
}

/// A single member added to or removed from a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    User(String),
    Group(String),
}

impl Member {
    pub fn name(&self) -> &str {
        match self {
            Member::User(name) | Member::Group(name) => name,
        }
    }

    /// Option name used by `group_add_member`/`group_remove_member`.
    pub fn option_key(&self) -> &'static str {
        match self {
            Member::User(_) => "user",
            Member::Group(_) => "group",
        }
    }

    /// Attribute listing members of this kind on the group.
    pub fn attr_key(&self) -> &'static str {
        match self {
            Member::User(_) => "member_user",
            Member::Group(_) => "member_group",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateOptions {
    pub nonposix: bool,
    pub external: bool,
}

#[derive(Debug, Clone)]
pub struct GroupTracker {
    cn: String,
    dn: String,
    create_options: CreateOptions,
    adds: Option<Member>,
    state: TrackerState,
}

impl GroupTracker {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_basedn(name, DEFAULT_BASEDN)
    }

    pub fn with_basedn(name: impl Into<String>, basedn: &str) -> Self {
        let cn = name.into();
        let dn = group_dn(&cn, basedn);
        Self {
            cn,
            dn,
            create_options: CreateOptions::default(),
            adds: None,
            state: TrackerState::default(),
        }
    }

    pub fn from_env(name: impl Into<String>, env: &Env) -> Self {
        Self::with_basedn(name, &env.basedn)
    }

    pub fn with_create_options(mut self, options: CreateOptions) -> Self {
        self.create_options = options;
        self
    }

    pub fn cn(&self) -> &str {
        &self.cn
    }

    pub fn dn(&self) -> &str {
        &self.dn
    }

    /// Member named by the last `make_add_member_command`.
    pub fn adds(&self) -> Option<&Member> {
        self.adds.as_ref()
    }

    /// Records `member` as expected on the group and builds `group_add_member`.
    pub fn make_add_member_command(&mut self, member: Member) -> Command {
        self.push_member(&member);
        let command = Command::new("group_add_member")
            .arg(self.cn.as_str())
            .option(member.option_key(), member.name());
        self.adds = Some(member);
        command
    }

    pub fn make_remove_member_command(&mut self, member: &Member) -> Command {
        self.drop_member(member);
        Command::new("group_remove_member")
            .arg(self.cn.as_str())
            .option(member.option_key(), member.name())
    }

    pub fn make_detach_command(&mut self) -> Command {
        self.state.exists = true;
        Command::new("group_detach").arg(self.cn.as_str())
    }

    pub fn check_add_member(&self, result: &Value) -> Result<(), TrackerError> {
        let expected = self.member_response(1, no_failures());
        expected.check(result)?;
        Ok(())
    }

    /// Checks a `group_add_member` call whose member does not exist.
    ///
    /// The member recorded by the add is dropped again, and the response must
    /// report it as failed with "no such entry".
    pub fn check_add_member_negative(&mut self, result: &Value) -> Result<(), TrackerError> {
        let adds = self
            .adds
            .clone()
            .ok_or_else(|| TrackerError::NoPendingAdd(self.cn.clone()))?;
        self.drop_member(&adds);

        let mut failed = no_failures();
        failed.set(
            &adds,
            Expected::list([Expected::list([adds.name(), NO_SUCH_ENTRY])]),
        );

        let expected = self.member_response(0, failed);
        expected.check(result)?;
        Ok(())
    }

    pub fn check_remove_member(&self, result: &Value) -> Result<(), TrackerError> {
        let expected = self.member_response(1, no_failures());
        expected.check(result)?;
        Ok(())
    }

    pub fn check_detach(&self, result: &Value) -> Result<(), TrackerError> {
        let expected = Expected::map([
            ("value", Expected::from(&self.cn)),
            (
                "summary",
                Expected::from(format!(
                    "Detached group \"{}\" from user \"{}\"",
                    self.cn, self.cn
                )),
            ),
            ("result", Expected::from(true)),
        ]);
        expected.check(result)?;
        Ok(())
    }

    fn member_response(&self, completed: u64, failed: MemberFailures) -> Expected {
        Expected::map([
            ("completed", Expected::from(completed)),
            (
                "failed",
                Expected::map([(
                    "member",
                    Expected::map([("group", failed.group), ("user", failed.user)]),
                )]),
            ),
            ("result", self.filtered(ADD_MEMBER_KEYS)),
        ])
    }

    fn push_member(&mut self, member: &Member) {
        let entry = self
            .state
            .attrs
            .entry(member.attr_key().to_string())
            .or_insert_with(|| Expected::List(Vec::new()));

        let name = Expected::from(member.name());
        match entry {
            Expected::List(items) if !items.contains(&name) => items.push(name),
            Expected::List(_) => {}
            other => *other = Expected::list([name]),
        }
    }

    fn drop_member(&mut self, member: &Member) {
        let key = member.attr_key();
        let name = Expected::from(member.name());

        let now_empty = match self.state.attrs.get_mut(key) {
            Some(Expected::List(items)) => {
                items.retain(|item| *item != name);
                items.is_empty()
            }
            Some(_) => true,
            None => false,
        };
        if now_empty {
            self.state.attrs.remove(key);
        }
    }

    fn filtered(&self, keys: &[&str]) -> Expected {
        self.state.filter_attrs(keys.iter().copied())
    }
}

struct MemberFailures {
    group: Expected,
    user: Expected,
}

impl MemberFailures {
    fn set(&mut self, member: &Member, failures: Expected) {
        match member {
            Member::Group(_) => self.group = failures,
            Member::User(_) => self.user = failures,
        }
    }
}

fn no_failures() -> MemberFailures {
    MemberFailures {
        group: Expected::List(Vec::new()),
        user: Expected::List(Vec::new()),
    }
}

impl Tracker for GroupTracker {
    fn name(&self) -> &str {
        &self.cn
    }

    fn state(&self) -> &TrackerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut TrackerState {
        &mut self.state
    }

    fn make_create_command(&self) -> Command {
        Command::new("group_add")
            .arg(self.cn.as_str())
            .option("nonposix", self.create_options.nonposix)
            .option("external", self.create_options.external)
    }

    fn make_delete_command(&self) -> Command {
        Command::new("group_del").arg(self.cn.as_str())
    }

    fn make_retrieve_command(&self, all: bool) -> Command {
        Command::new("group_show")
            .arg(self.cn.as_str())
            .option("all", all)
    }

    fn make_find_command(&self, args: Vec<Value>, options: Map<String, Value>) -> Command {
        let mut command = Command::new("group_find").options(options);
        command.args = args;
        command
    }

    fn make_update_command(&self, updates: &Map<String, Value>) -> Command {
        Command::new("group_mod")
            .arg(self.cn.as_str())
            .options(updates.clone())
    }

    fn track_create(&mut self) {
        self.adds = None;
        self.state.attrs = [
            ("dn", Expected::from(&self.dn)),
            ("cn", Expected::list([self.cn.as_str()])),
            ("gidnumber", Expected::list([Expected::Digits])),
            ("ipauniqueid", Expected::list([Expected::Uuid])),
            (
                "objectclass",
                Expected::list(POSIXGROUP_OBJECTCLASSES.iter().copied()),
            ),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect();
        self.state.exists = true;
    }

    fn check_create(&self, result: &Value) -> Result<(), TrackerError> {
        let expected = Expected::map([
            ("value", Expected::from(&self.cn)),
            (
                "summary",
                Expected::from(format!("Added group \"{}\"", self.cn)),
            ),
            ("result", self.filtered(CREATE_KEYS)),
        ]);
        expected.check(result)?;
        Ok(())
    }

    fn check_delete(&self, result: &Value) -> Result<(), TrackerError> {
        let expected = Expected::map([
            ("value", Expected::list([self.cn.as_str()])),
            (
                "summary",
                Expected::from(format!("Deleted group \"{}\"", self.cn)),
            ),
            (
                "result",
                Expected::map([("failed", Expected::List(Vec::new()))]),
            ),
        ]);
        expected.check(result)?;
        Ok(())
    }

    fn check_retrieve(&self, result: &Value, all: bool) -> Result<(), TrackerError> {
        let keys = if all { RETRIEVE_ALL_KEYS } else { RETRIEVE_KEYS };
        let expected = Expected::map([
            ("value", Expected::from(&self.cn)),
            ("summary", Expected::null()),
            ("result", self.filtered(keys)),
        ]);
        expected.check(result)?;
        Ok(())
    }

    fn check_find(&self, result: &Value, all: bool) -> Result<(), TrackerError> {
        let keys = if all { RETRIEVE_ALL_KEYS } else { RETRIEVE_KEYS };
        let expected = Expected::map([
            ("count", Expected::from(1u64)),
            ("truncated", Expected::from(false)),
            ("summary", Expected::from("1 group matched")),
            ("result", Expected::List(vec![self.filtered(keys)])),
        ]);
        expected.check(result)?;
        Ok(())
    }

    fn check_update(&self, result: &Value, extra_keys: &[&str]) -> Result<(), TrackerError> {
        let keys: Vec<&str> = UPDATE_KEYS
            .iter()
            .copied()
            .chain(extra_keys.iter().copied())
            .collect();
        let expected = Expected::map([
            ("value", Expected::from(&self.cn)),
            (
                "summary",
                Expected::from(format!("Modified group \"{}\"", self.cn)),
            ),
            ("result", self.filtered(&keys)),
        ]);
        expected.check(result)?;
        Ok(())
    }
}
