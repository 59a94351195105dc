//! Expected-value trees and the deep comparison used by trackers.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Shape a JSON response value is expected to have.
#[derive(Debug, Clone, PartialEq)]
pub enum Expected {
    /// Equal to this scalar value.
    Exact(Value),
    /// A string of ASCII digits, or a non-negative integer.
    Digits,
    /// A lower-case hyphenated UUID string.
    Uuid,
    Any,
    List(Vec<Expected>),
    Map(BTreeMap<String, Expected>),
}

impl Expected {
    pub fn null() -> Self {
        Expected::Exact(Value::Null)
    }

    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Expected>,
    {
        Expected::List(items.into_iter().map(Into::into).collect())
    }

    pub fn map<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Expected)>,
    {
        Expected::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect(),
        )
    }

    /// Checks `got` against this shape.
    pub fn check(&self, got: &Value) -> Result<(), Mismatch> {
        check_at(self, got, "$")
    }

    pub fn matches(&self, got: &Value) -> bool {
        self.check(got).is_ok()
    }

    fn exact_scalar(&self) -> Option<&Value> {
        match self {
            Expected::Exact(value) if !value.is_array() && !value.is_object() => Some(value),
            _ => None,
        }
    }
}

impl From<Value> for Expected {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => Expected::List(items.into_iter().map(Expected::from).collect()),
            Value::Object(fields) => Expected::Map(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, Expected::from(value)))
                    .collect(),
            ),
            scalar => Expected::Exact(scalar),
        }
    }
}

impl From<&str> for Expected {
    fn from(value: &str) -> Self {
        Expected::Exact(Value::from(value))
    }
}

impl From<String> for Expected {
    fn from(value: String) -> Self {
        Expected::Exact(Value::from(value))
    }
}

impl From<&String> for Expected {
    fn from(value: &String) -> Self {
        Expected::Exact(Value::from(value.as_str()))
    }
}

impl From<bool> for Expected {
    fn from(value: bool) -> Self {
        Expected::Exact(Value::from(value))
    }
}

impl From<u64> for Expected {
    fn from(value: u64) -> Self {
        Expected::Exact(Value::from(value))
    }
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Exact(value) => write!(f, "{value}"),
            Expected::Digits => write!(f, "<digits>"),
            Expected::Uuid => write!(f, "<uuid>"),
            Expected::Any => write!(f, "<any>"),
            Expected::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Expected::Map(fields) => {
                write!(f, "{{")?;
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "\"{key}\":{value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// First difference found between an expected shape and a response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{path}: {message}")]
pub struct Mismatch {
    pub path: String,
    pub message: String,
}

impl Mismatch {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }

    fn value(path: &str, expected: &Expected, got: &Value) -> Self {
        Self::new(path, format!("expected {expected}, got {got}"))
    }
}

/// Compares a response against its expected shape.
///
/// Objects must have exactly the expected keys. Lists must have the expected
/// length; lists of plain scalars are compared without regard to order.
pub fn assert_deep_equal(expected: &Expected, got: &Value) -> Result<(), Mismatch> {
    expected.check(got)
}

fn check_at(expected: &Expected, got: &Value, path: &str) -> Result<(), Mismatch> {
    match expected {
        Expected::Any => Ok(()),
        Expected::Exact(value) => {
            if value == got {
                Ok(())
            } else {
                Err(Mismatch::value(path, expected, got))
            }
        }
        Expected::Digits => {
            let ok = match got {
                Value::String(s) => !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()),
                Value::Number(n) => n.is_u64(),
                _ => false,
            };
            if ok {
                Ok(())
            } else {
                Err(Mismatch::value(path, expected, got))
            }
        }
        Expected::Uuid => {
            let ok = got.as_str().is_some_and(|s| {
                uuid::Uuid::parse_str(s)
                    .map(|id| id.hyphenated().to_string() == s)
                    .unwrap_or(false)
            });
            if ok {
                Ok(())
            } else {
                Err(Mismatch::value(path, expected, got))
            }
        }
        Expected::List(items) => {
            let Value::Array(got_items) = got else {
                return Err(Mismatch::value(path, expected, got));
            };
            if items.len() != got_items.len() {
                return Err(Mismatch::new(
                    path,
                    format!(
                        "expected {} items, got {}: expected {expected}, got {got}",
                        items.len(),
                        got_items.len()
                    ),
                ));
            }
            check_list(items, got_items, path)
        }
        Expected::Map(fields) => {
            let Value::Object(got_fields) = got else {
                return Err(Mismatch::value(path, expected, got));
            };

            let missing: Vec<&str> = fields
                .keys()
                .filter(|key| !got_fields.contains_key(key.as_str()))
                .map(String::as_str)
                .collect();
            let extra: Vec<&str> = got_fields
                .keys()
                .filter(|key| !fields.contains_key(key.as_str()))
                .map(String::as_str)
                .collect();
            if !missing.is_empty() || !extra.is_empty() {
                return Err(Mismatch::new(
                    path,
                    format!("missing keys {missing:?}, extra keys {extra:?}"),
                ));
            }

            for (key, sub) in fields {
                check_at(sub, &got_fields[key.as_str()], &format!("{path}.{key}"))?;
            }
            Ok(())
        }
    }
}

fn check_list(items: &[Expected], got_items: &[Value], path: &str) -> Result<(), Mismatch> {
    let expected_scalars: Option<Vec<&Value>> = items.iter().map(Expected::exact_scalar).collect();
    let all_scalar = got_items.iter().all(|v| !v.is_array() && !v.is_object());

    if let (Some(mut expected_scalars), true) = (expected_scalars, all_scalar) {
        let mut got_sorted: Vec<&Value> = got_items.iter().collect();
        expected_scalars.sort_by_key(|v| sort_key(v));
        got_sorted.sort_by_key(|v| sort_key(v));

        for (i, (e, g)) in expected_scalars.iter().zip(&got_sorted).enumerate() {
            if e != g {
                return Err(Mismatch::new(
                    &format!("{path}[{i}]"),
                    format!("expected {e}, got {g} (after sorting)"),
                ));
            }
        }
        return Ok(());
    }

    for (i, (sub, value)) in items.iter().zip(got_items).enumerate() {
        check_at(sub, value, &format!("{path}[{i}]"))?;
    }
    Ok(())
}

fn sort_key(value: &Value) -> (u8, String) {
    let rank = match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    };
    (rank, value.to_string())
}
