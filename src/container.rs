//! Keyed containers: a mapping from field name to value with list-like helpers.
//!
//! The helpers live on [`Keyed`] itself and on nothing else. Entries keep their
//! insertion order, but callers of [`Keyed::for_each`], [`Keyed::map`] and
//! [`Keyed::reduce`] should not rely on a particular visitation order unless
//! they built the container themselves.

use std::fmt;

use indexmap::IndexMap;
use serde_json::{Number, Value};

use crate::domain::{Field, TableError};

#[derive(Debug, Clone, PartialEq)]
pub struct Keyed<V> {
    entries: IndexMap<Field, V>,
}

/// A single input record.
pub type Record = Keyed<RawValue>;

impl<V> Default for Keyed<V> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<V> Keyed<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<Field>, value: V) -> Option<V> {
        self.entries.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    /// Entry at `idx` in insertion order.
    pub fn get_index(&self, idx: usize) -> Option<(&str, &V)> {
        self.entries.get_index(idx).map(|(k, v)| (k.as_str(), v))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.entries.values_mut()
    }

    /// Calls `f` once per entry.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&str, &V),
    {
        for (k, v) in &self.entries {
            f(k, v);
        }
    }

    /// Converts the container into a sequence, one result per entry.
    pub fn map<R, F>(&self, mut f: F) -> Vec<R>
    where
        F: FnMut(&str, &V) -> R,
    {
        self.entries.iter().map(|(k, v)| f(k, v)).collect()
    }

    /// Returns a new container holding the entries accepted by `predicate`.
    pub fn filter<F>(&self, mut predicate: F) -> Keyed<V>
    where
        V: Clone,
        F: FnMut(&str, &V) -> bool,
    {
        self.entries
            .iter()
            .filter(|(k, v)| predicate(k, v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Left fold over all entries. The visitation order is unspecified.
    pub fn reduce<A, F>(&self, init: A, mut f: F) -> A
    where
        F: FnMut(A, &str, &V) -> A,
    {
        self.entries.iter().fold(init, |acc, (k, v)| f(acc, k, v))
    }

    pub fn keys(&self) -> Vec<Field> {
        self.entries.keys().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }
}

impl<K: Into<Field>, V> FromIterator<(K, V)> for Keyed<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl<V> IntoIterator for Keyed<V> {
    type Item = (Field, V);
    type IntoIter = indexmap::map::IntoIter<Field, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// A value as found in an input record.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Number(Number),
    Absent,
}

impl RawValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, RawValue::Absent)
    }

    /// Render form of the value, using `placeholder` for absent values.
    pub fn display(&self, placeholder: &str) -> String {
        match self {
            RawValue::Text(s) => s.replace("\r\n", " ↵ ").replace('\n', " ↵ "),
            RawValue::Number(n) => n.to_string(),
            RawValue::Absent => placeholder.to_string(),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display(""))
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<i64> for RawValue {
    fn from(n: i64) -> Self {
        RawValue::Number(n.into())
    }
}

impl TryFrom<Value> for RawValue {
    type Error = TableError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) => Ok(RawValue::Text(s)),
            Value::Number(n) => Ok(RawValue::Number(n)),
            Value::Null => Ok(RawValue::Absent),
            other => Err(TableError::MalformedRecord(format!(
                "unsupported value {other}, expected a string, a number or null"
            ))),
        }
    }
}

impl TryFrom<Value> for Record {
    type Error = TableError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(map) = value else {
            return Err(TableError::MalformedRecord(format!(
                "expected an object, got {value}"
            )));
        };
        map.into_iter()
            .map(|(k, v)| match RawValue::try_from(v) {
                Ok(raw) => Ok((k, raw)),
                Err(TableError::MalformedRecord(msg)) => {
                    Err(TableError::MalformedRecord(format!("field '{k}': {msg}")))
                }
                Err(e) => Err(e),
            })
            .collect()
    }
}
