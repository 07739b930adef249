//! Error types for the store crate.

use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when reading, writing or loading a [`Store`](crate::Store).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The key is empty, has empty segments, or segments outside `[a-z0-9-]`.
    #[error("illegal key: '{0}'")]
    IllegalKey(String),

    /// No value exists under the key.
    #[error("key not found: '{0}'")]
    KeyNotFound(String),

    /// A validator rejected the value.
    #[error("invalid value {value} for key '{key}': {msg}")]
    Validation {
        key: String,
        value: Value,
        msg: String,
    },

    /// Serialized store data could not be parsed.
    #[error("malformed store data: {0}")]
    Format(String),

    /// The stored value does not match the requested type.
    #[error("value for key '{key}' has an unexpected type: {source}")]
    Deserialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The separator is empty or collides with the key alphabet.
    #[error("invalid key separator: '{0}'")]
    InvalidSeparator(String),

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Builds a [`StoreError::Validation`]. Meant for use inside validators.
    pub fn validation(key: impl Into<String>, value: Value, msg: impl Into<String>) -> Self {
        StoreError::Validation {
            key: key.into(),
            value,
            msg: msg.into(),
        }
    }

    /// Returns true for [`StoreError::KeyNotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::KeyNotFound(_))
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
