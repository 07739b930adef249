//! The flat parameter mapping passed down the command tree.
//!
//! Parsing produces one mapping for the whole command line. Every level of
//! the tree that has children records the child the user picked under a
//! discriminator key: `_subcommand` at the root, `_subcommand_<a>` one level
//! down below `a`, `_subcommand_<a>_<b>` below `a b`, and so on.
//!
//! Routing one level down calls [`ParameterMapping::shift`], which consumes
//! `_subcommand` and renames the chosen child's keys so that the child sees
//! its own discriminator as `_subcommand` again:
//!
//! ```text
//! before shift                      after shift (picked "config")
//! _subcommand        = "config"     -
//! _subcommand_config = "get"        _subcommand = "get"
//! _subcommand_other  = null         _subcommand_other = null
//! key                = "db.host"    key = "db.host"
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Discriminator key for the current level.
pub const SUBCOMMAND_KEY: &str = "_subcommand";

/// Discriminator key for the node reached by `path` from the root.
pub fn discriminator_key<S: AsRef<str>>(path: &[S]) -> String {
    let mut key = String::from(SUBCOMMAND_KEY);
    for part in path {
        key.push('_');
        key.push_str(part.as_ref());
    }
    key
}

/// Parameter name to value, as collected from the command line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterMapping {
    values: BTreeMap<String, Value>,
}

impl ParameterMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// String value of `key`, or `None` if missing, null or not a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Flag value of `key`. Missing reads as `false`.
    pub fn get_flag(&self, key: &str) -> bool {
        self.values
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Counter value of `key`. Missing reads as `0`.
    pub fn get_count(&self, key: &str) -> u64 {
        self.values.get(key).and_then(Value::as_u64).unwrap_or(0)
    }

    /// String items of a list value. Non-string items are skipped.
    pub fn get_strings(&self, key: &str) -> Vec<String> {
        match self.values.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    /// The child picked at this level, if any.
    pub fn discriminator(&self) -> Option<&str> {
        self.get_str(SUBCOMMAND_KEY)
    }

    /// Consumes this level's discriminator and rescopes the chosen child's
    /// keys one level up. Returns the chosen child.
    ///
    /// A missing or null discriminator is removed and `None` returned; no
    /// other key changes in that case. Keys scoped to siblings of the chosen
    /// child are left alone.
    pub fn shift(&mut self) -> Option<String> {
        let child = match self.values.remove(SUBCOMMAND_KEY)? {
            Value::String(child) => child,
            _ => return None,
        };

        let scope = discriminator_key(&[child.as_str()]);
        let nested = format!("{}_", scope);

        let (moved, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.values)
            .into_iter()
            .partition(|(key, _)| *key == scope || key.starts_with(&nested));

        self.values = kept.into_iter().collect();
        for (key, value) in moved {
            let rest = &key[scope.len()..];
            self.values.insert(format!("{}{}", SUBCOMMAND_KEY, rest), value);
        }

        Some(child)
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.values
    }
}

impl From<BTreeMap<String, Value>> for ParameterMapping {
    fn from(values: BTreeMap<String, Value>) -> Self {
        Self { values }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ParameterMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for ParameterMapping {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}
