//! Trackers model the expected server-side state of one entry and check
//! management command responses against it.
//!
//! A tracker builds the [`Command`] for each operation, updates its
//! expected attributes as the operation would on the server, and compares the
//! response with the fixed template for that operation. Commands are run
//! through a [`CommandExecutor`], which is whatever dispatches them to a
//! server (or a fake of one).

pub mod expect;
pub mod group;

pub use expect::{assert_deep_equal, Expected, Mismatch};
pub use group::{CreateOptions, GroupTracker, Member};

use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::error::{CommandError, TrackerError};

/// A management command invocation: name, positional args and options.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub name: String,
    pub args: Vec<Value>,
    pub options: Map<String, Value>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            options: Map::new(),
        }
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn options(mut self, options: Map<String, Value>) -> Self {
        self.options.extend(options);
        self
    }

    pub fn run(&self, executor: &dyn CommandExecutor) -> Result<Value, CommandError> {
        debug!(command = %self.name, args = ?self.args, "Running command");
        executor.execute(self)
    }
}

pub trait CommandExecutor {
    fn execute(&self, command: &Command) -> Result<Value, CommandError>;
}

/// Expected attributes of the tracked entry and whether it exists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerState {
    pub attrs: BTreeMap<String, Expected>,
    pub exists: bool,
}

impl TrackerState {
    /// The subset of tracked attributes whose names are in `keys`.
    pub fn filter_attrs<'a, I>(&self, keys: I) -> Expected
    where
        I: IntoIterator<Item = &'a str>,
    {
        let keys: BTreeSet<&str> = keys.into_iter().collect();
        Expected::Map(
            self.attrs
                .iter()
                .filter(|(key, _)| keys.contains(key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        )
    }

    /// Applies attribute changes; a null value drops the attribute.
    pub fn apply_updates(&mut self, updates: &Map<String, Value>) {
        for (key, value) in updates {
            if value.is_null() {
                self.attrs.remove(key);
            } else {
                self.attrs.insert(key.clone(), Expected::from(value.clone()));
            }
        }
    }
}

pub trait Tracker {
    /// Primary key of the tracked entry.
    fn name(&self) -> &str;

    fn state(&self) -> &TrackerState;

    fn state_mut(&mut self) -> &mut TrackerState;

    fn make_create_command(&self) -> Command;

    fn make_delete_command(&self) -> Command;

    fn make_retrieve_command(&self, all: bool) -> Command;

    fn make_find_command(&self, args: Vec<Value>, options: Map<String, Value>) -> Command;

    fn make_update_command(&self, updates: &Map<String, Value>) -> Command;

    fn track_create(&mut self);

    fn track_delete(&mut self) {
        let state = self.state_mut();
        state.attrs.clear();
        state.exists = false;
    }

    fn check_create(&self, result: &Value) -> Result<(), TrackerError>;

    fn check_delete(&self, result: &Value) -> Result<(), TrackerError>;

    fn check_retrieve(&self, result: &Value, all: bool) -> Result<(), TrackerError>;

    fn check_find(&self, result: &Value, all: bool) -> Result<(), TrackerError>;

    fn check_update(&self, result: &Value, extra_keys: &[&str]) -> Result<(), TrackerError>;

    fn create(&mut self, executor: &dyn CommandExecutor) -> Result<(), TrackerError> {
        self.track_create();
        let result = self.make_create_command().run(executor)?;
        self.check_create(&result)
    }

    fn delete(&mut self, executor: &dyn CommandExecutor) -> Result<(), TrackerError> {
        self.track_delete();
        let result = self.make_delete_command().run(executor)?;
        self.check_delete(&result)
    }

    fn retrieve(&mut self, executor: &dyn CommandExecutor, all: bool) -> Result<(), TrackerError> {
        self.ensure_exists(executor)?;
        let result = self.make_retrieve_command(all).run(executor)?;
        self.check_retrieve(&result, all)
    }

    fn find(&mut self, executor: &dyn CommandExecutor, all: bool) -> Result<(), TrackerError> {
        self.ensure_exists(executor)?;
        let mut options = Map::new();
        options.insert("all".to_string(), Value::Bool(all));
        let command = self.make_find_command(vec![Value::from(self.name())], options);
        let result = command.run(executor)?;
        self.check_find(&result, all)
    }

    /// Runs an update and checks the response. `expected_updates` overrides
    /// what the tracker expects for attributes the server rewrites.
    fn update(
        &mut self,
        executor: &dyn CommandExecutor,
        updates: &Map<String, Value>,
        expected_updates: &Map<String, Value>,
    ) -> Result<(), TrackerError> {
        self.ensure_exists(executor)?;

        let result = self.make_update_command(updates).run(executor)?;

        let state = self.state_mut();
        state.apply_updates(updates);
        state.apply_updates(expected_updates);

        let extra_keys: BTreeSet<&str> = updates
            .keys()
            .chain(expected_updates.keys())
            .map(String::as_str)
            .collect();
        let extra_keys: Vec<&str> = extra_keys.into_iter().collect();
        self.check_update(&result, &extra_keys)
    }

    fn ensure_exists(&mut self, executor: &dyn CommandExecutor) -> Result<(), TrackerError> {
        if !self.state().exists {
            self.create(executor)?;
        }
        Ok(())
    }

    fn ensure_missing(&mut self, executor: &dyn CommandExecutor) -> Result<(), TrackerError> {
        if self.state().exists {
            self.delete(executor)?;
        }
        Ok(())
    }
}
