//! Hierarchical settings store addressed by dotted key paths.
//!
//! A [`Store`] keeps JSON values in nested namespaces. Keys are paths such as
//! `"db.primary.host"`: every segment but the last names a namespace, the last
//! names the value.
//!
//! # Quick Start
//!
//! ```rust
//! use appkit_store::Store;
//! use serde_json::json;
//!
//! let mut settings = Store::new();
//! settings.set("db.host", "localhost")?;
//! settings.set("db.port", 5432)?;
//!
//! assert_eq!(settings.get("db")?, json!({"host": "localhost", "port": 5432}));
//! assert_eq!(settings.get_or("db.user", "postgres")?, json!("postgres"));
//! assert_eq!(settings.children(Some("db"))?, vec!["host", "port"]);
//! # Ok::<(), appkit_store::StoreError>(())
//! ```
//!
//! # Key Rules
//!
//! | Rule | Failure |
//! |------|---------|
//! | Segments match `^[a-z0-9-]+$` | [`StoreError::IllegalKey`] |
//! | No empty key, no empty segments (`.a`, `a.`, `a..b`) | [`StoreError::IllegalKey`] |
//! | Reads of missing keys | [`StoreError::KeyNotFound`] (or a default via [`Store::get_or`]) |
//!
//! # Validators
//!
//! Validators see every write and can transform or reject the value. They run
//! in the order they were added. [`TypeValidator`] covers the common case of
//! pinning keys to a scalar type.
//!
//! # Serialization
//!
//! [`Store::dump`] writes the tree as one pretty-printed JSON object;
//! [`Store::load`] merges such an object back in and reports malformed input
//! as [`StoreError::Format`].

mod error;
mod flatten;
mod store;
mod validator;

pub use error::{Result, StoreError};
pub use flatten::{flatten, unflatten};
pub use store::{Store, StoreBuilder, DEFAULT_SEPARATOR};
pub use validator::{TypeValidator, Validator, ValueKind};
