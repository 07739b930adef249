//! The hierarchical [`Store`].

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

use crate::error::{Result, StoreError};
use crate::flatten::{ensure_namespace, flatten};
use crate::validator::Validator;

static SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9-]+$").expect("segment pattern is valid"));

/// Default path separator.
pub const DEFAULT_SEPARATOR: &str = ".";

/// A settings container addressed by separator-joined key paths.
///
/// Values are [`serde_json::Value`]s kept in nested objects: `set("a.b", 1)`
/// produces the tree `{"a": {"b": 1}}`. Objects along a path are
/// *namespaces*, everything else is a leaf.
///
/// Writing through a leaf replaces it: after `set("a", 1)` and
/// `set("a.b", 2)`, `a` is the namespace `{"b": 2}` and the `1` is gone. Use a
/// validator if that loss is not acceptable for some key.
///
/// Every value handed out is an owned copy of the stored one.
pub struct Store {
    root: Map<String, Value>,
    validators: Vec<Box<dyn Validator>>,
    separator: String,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("separator", &self.separator)
            .field("validators", &self.validators.len())
            .field("root", &self.root)
            .finish()
    }
}

impl Store {
    /// Creates an empty store using `.` as separator and no validators.
    pub fn new() -> Self {
        Self {
            root: Map::new(),
            validators: Vec::new(),
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }

    pub fn builder() -> StoreBuilder {
        StoreBuilder::default()
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Appends a validator. Validators run in the order they were added.
    pub fn add_validator<V: Validator + 'static>(&mut self, validator: V) {
        self.validators.push(Box::new(validator));
    }

    fn split_key<'k>(&self, key: &'k str) -> Result<Vec<&'k str>> {
        let parts: Vec<&str> = key.split(self.separator.as_str()).collect();
        if parts.iter().all(|part| SEGMENT.is_match(part)) {
            Ok(parts)
        } else {
            Err(StoreError::IllegalKey(key.to_string()))
        }
    }

    // Path resolution. Both walks split the key, descend through every segment
    // but the last and hand back (parent namespace, leaf segment). The read
    // walk fails on a missing or non-object ancestor; the write walk does the
    // same unless `create` is set, in which case it creates missing namespaces
    // and replaces leaves in the way.

    fn walk<'s, 'k>(&'s self, key: &'k str) -> Result<(&'s Map<String, Value>, &'k str)> {
        let parts = self.split_key(key)?;
        let (leaf, parents) = parts
            .split_last()
            .ok_or_else(|| StoreError::IllegalKey(key.to_string()))?;

        let mut node = &self.root;
        for part in parents {
            node = node
                .get(*part)
                .and_then(Value::as_object)
                .ok_or_else(|| StoreError::KeyNotFound(key.to_string()))?;
        }

        Ok((node, *leaf))
    }

    fn walk_mut<'s, 'k>(
        &'s mut self,
        key: &'k str,
        create: bool,
    ) -> Result<(&'s mut Map<String, Value>, &'k str)> {
        let parts = self.split_key(key)?;
        let (leaf, parents) = parts
            .split_last()
            .ok_or_else(|| StoreError::IllegalKey(key.to_string()))?;

        let mut node = &mut self.root;
        for part in parents {
            node = if create {
                let slot = node
                    .entry(part.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                ensure_namespace(slot)
            } else {
                node.get_mut(*part)
                    .and_then(Value::as_object_mut)
                    .ok_or_else(|| StoreError::KeyNotFound(key.to_string()))?
            };
        }

        Ok((node, *leaf))
    }

    /// Runs `value` through every validator, in order.
    pub fn validate_value_for_key(&self, key: &str, value: Value) -> Result<Value> {
        self.validators
            .iter()
            .try_fold(value, |value, validator| validator.validate(key, value))
    }

    /// Stores `value` under `key`, creating intermediate namespaces.
    ///
    /// The key is checked first, then the validators run; if any of them
    /// rejects the value the store is left untouched.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.split_key(key)?;
        let value = self.validate_value_for_key(key, value.into())?;

        let (node, leaf) = self.walk_mut(key, true)?;
        node.insert(leaf.to_string(), value);
        Ok(())
    }

    /// Returns a copy of the value under `key`.
    pub fn get(&self, key: &str) -> Result<Value> {
        let (node, leaf) = self.walk(key)?;
        node.get(leaf)
            .cloned()
            .ok_or_else(|| StoreError::KeyNotFound(key.to_string()))
    }

    /// Like [`get`](Self::get), returning `default` when the key is missing.
    ///
    /// Illegal keys are still an error.
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Result<Value> {
        match self.get(key) {
            Err(StoreError::KeyNotFound(_)) => Ok(default.into()),
            other => other,
        }
    }

    /// Returns the value under `key` deserialized as `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        serde_json::from_value(self.get(key)?).map_err(|source| StoreError::Deserialize {
            key: key.to_string(),
            source,
        })
    }

    /// Returns a copy of the whole tree.
    pub fn tree(&self) -> Value {
        Value::Object(self.root.clone())
    }

    /// Removes `key` and everything below it.
    pub fn delete(&mut self, key: &str) -> Result<()> {
        let (node, leaf) = self.walk_mut(key, false)?;
        node.remove(leaf)
            .map(|_| ())
            .ok_or_else(|| StoreError::KeyNotFound(key.to_string()))
    }

    /// Lists the immediate children of a namespace, or the top-level keys for `None`.
    pub fn children(&self, key: Option<&str>) -> Result<Vec<String>> {
        let Some(key) = key else {
            return Ok(self.root.keys().cloned().collect());
        };

        let (node, leaf) = self.walk(key)?;
        node.get(leaf)
            .and_then(Value::as_object)
            .map(|ns| ns.keys().cloned().collect())
            .ok_or_else(|| StoreError::KeyNotFound(key.to_string()))
    }

    /// Returns true if anything, leaf or namespace, is stored under `key`.
    pub fn has_key(&self, key: &str) -> bool {
        self.walk(key)
            .map(|(node, leaf)| node.contains_key(leaf))
            .unwrap_or(false)
    }

    /// Returns true if `key` holds a namespace.
    pub fn has_namespace(&self, key: &str) -> bool {
        self.walk(key)
            .map(|(node, leaf)| node.get(leaf).is_some_and(Value::is_object))
            .unwrap_or(false)
    }

    /// Returns every leaf keyed by its full path.
    pub fn all_keys(&self) -> Map<String, Value> {
        flatten(&self.root, &self.separator)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Drops every key. Validators and separator are kept.
    pub fn clear(&mut self) {
        self.root.clear();
    }

    /// Merges a (possibly nested) object into the store, leaf by leaf.
    ///
    /// Leaves are written in path order and each goes through
    /// [`set`](Self::set); on error, leaves before the failing one stay written.
    pub fn update(&mut self, data: &Map<String, Value>) -> Result<()> {
        for (key, value) in flatten(data, &self.separator) {
            self.set(&key, value)?;
        }
        Ok(())
    }

    /// Clears the store and loads `data`.
    pub fn replace(&mut self, data: &Map<String, Value>) -> Result<()> {
        self.clear();
        self.update(data)
    }

    /// Writes the tree as pretty JSON with sorted keys.
    pub fn dump<W: Write>(&self, writer: W) -> Result<()> {
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(writer, formatter);
        self.root
            .serialize(&mut ser)
            .map_err(|e| StoreError::Io(e.into()))
    }

    /// Reads a JSON object and merges it into the store.
    pub fn load<R: Read>(&mut self, reader: R) -> Result<()> {
        let data: Value = serde_json::from_reader(reader).map_err(|e| {
            if e.is_io() {
                StoreError::Io(e.into())
            } else {
                StoreError::Format(e.to_string())
            }
        })?;

        match data {
            Value::Object(map) => self.update(&map),
            other => Err(StoreError::Format(format!(
                "expected a JSON object at top level, found {}",
                kind_name(&other)
            ))),
        }
    }

    /// [`load`](Self::load) from a file.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::open(path)?;
        self.load(BufReader::new(file))
    }

    /// [`dump`](Self::dump) to a file, replacing its contents.
    pub fn dump_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.dump(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Builder for a [`Store`] with a custom separator, validators or initial items.
#[derive(Default)]
pub struct StoreBuilder {
    separator: Option<String>,
    validators: Vec<Box<dyn Validator>>,
    items: Map<String, Value>,
}

impl StoreBuilder {
    /// Sets the path separator. It must be non-empty and use no characters
    /// that are legal inside a key segment.
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    pub fn validator<V: Validator + 'static>(mut self, validator: V) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    /// Initial contents, written through the validators on build.
    pub fn items(mut self, items: Map<String, Value>) -> Self {
        self.items.extend(items);
        self
    }

    pub fn build(self) -> Result<Store> {
        let separator = self
            .separator
            .unwrap_or_else(|| DEFAULT_SEPARATOR.to_string());
        if separator.is_empty()
            || separator
                .chars()
                .any(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(StoreError::InvalidSeparator(separator));
        }

        let mut store = Store {
            root: Map::new(),
            validators: self.validators,
            separator,
        };
        store.update(&self.items)?;
        Ok(store)
    }
}
