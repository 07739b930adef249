//! Value validators.
//!
//! A validator sees every `(key, value)` pair written with
//! [`Store::set`](crate::Store::set) and returns the value to store, possibly
//! transformed, or a [`StoreError::Validation`] to reject it. Any
//! `Fn(&str, Value) -> Result<Value, StoreError>` closure is a validator.

use std::collections::HashMap;

use serde_json::{Number, Value};

use crate::error::StoreError;

/// Checks or transforms values before they are stored.
pub trait Validator {
    fn validate(&self, key: &str, value: Value) -> Result<Value, StoreError>;
}

impl<F> Validator for F
where
    F: Fn(&str, Value) -> Result<Value, StoreError>,
{
    fn validate(&self, key: &str, value: Value) -> Result<Value, StoreError> {
        self(key, value)
    }
}

/// Scalar kinds understood by [`TypeValidator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    String,
}

impl ValueKind {
    /// Converts `value` to this kind, or `None` when no sensible conversion exists.
    ///
    /// Floats truncate towards zero when converted to `Int`. Strings are parsed
    /// (`"3"`, `"2.5"`, `"yes"`/`"no"`); scalars render to strings.
    pub fn coerce(self, value: &Value) -> Option<Value> {
        match (self, value) {
            (_, Value::Null) | (_, Value::Array(_)) | (_, Value::Object(_)) => None,

            (ValueKind::Bool, Value::Bool(b)) => Some(Value::Bool(*b)),
            (ValueKind::Bool, Value::Number(n)) => n.as_f64().map(|f| Value::Bool(f != 0.0)),
            (ValueKind::Bool, Value::String(s)) => parse_bool(s).map(Value::Bool),

            (ValueKind::Int, Value::Bool(b)) => Some(Value::from(i64::from(*b))),
            (ValueKind::Int, Value::Number(n)) => match n.as_i64() {
                Some(i) => Some(Value::from(i)),
                None => n
                    .as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| Value::from(f.trunc() as i64)),
            },
            (ValueKind::Int, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),

            (ValueKind::Float, Value::Bool(b)) => float(if *b { 1.0 } else { 0.0 }),
            (ValueKind::Float, Value::Number(n)) => n.as_f64().and_then(float),
            (ValueKind::Float, Value::String(s)) => s.trim().parse::<f64>().ok().and_then(float),

            (ValueKind::String, Value::String(s)) => Some(Value::String(s.clone())),
            (ValueKind::String, Value::Bool(b)) => Some(Value::String(b.to_string())),
            (ValueKind::String, Value::Number(n)) => Some(Value::String(n.to_string())),
        }
    }
}

fn float(f: f64) -> Option<Value> {
    Number::from_f64(f).map(Value::Number)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Coerces values for known keys to a fixed [`ValueKind`].
///
/// Keys without a declared kind pass through untouched.
///
/// ```rust
/// use appkit_store::{Store, TypeValidator, ValueKind};
///
/// let mut store = Store::builder()
///     .validator(TypeValidator::new().with("server.port", ValueKind::Int))
///     .build()?;
///
/// store.set("server.port", "8080")?;
/// assert_eq!(store.get("server.port")?, 8080);
/// assert!(store.set("server.port", "http").is_err());
/// # Ok::<(), appkit_store::StoreError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct TypeValidator {
    kinds: HashMap<String, ValueKind>,
}

impl TypeValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares the kind for `key`.
    pub fn with(mut self, key: impl Into<String>, kind: ValueKind) -> Self {
        self.kinds.insert(key.into(), kind);
        self
    }

    /// Returns the kind declared for `key`, if any.
    pub fn kind_of(&self, key: &str) -> Option<ValueKind> {
        self.kinds.get(key).copied()
    }
}

impl<K: Into<String>> FromIterator<(K, ValueKind)> for TypeValidator {
    fn from_iter<I: IntoIterator<Item = (K, ValueKind)>>(iter: I) -> Self {
        Self {
            kinds: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl Validator for TypeValidator {
    fn validate(&self, key: &str, value: Value) -> Result<Value, StoreError> {
        match self.kinds.get(key) {
            None => Ok(value),
            Some(kind) => kind
                .coerce(&value)
                .ok_or_else(|| StoreError::validation(key, value, "incompatible type")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_closure_is_validator() {
        let upper = |_key: &str, value: Value| -> Result<Value, StoreError> {
            Ok(Value::String(value.as_str().unwrap_or_default().to_uppercase()))
        };
        assert_eq!(upper.validate("k", json!("abc")).unwrap(), json!("ABC"));
    }

    #[test]
    fn test_coerce_int() {
        assert_eq!(ValueKind::Int.coerce(&json!(1.9)), Some(json!(1)));
        assert_eq!(ValueKind::Int.coerce(&json!(-1.9)), Some(json!(-1)));
        assert_eq!(ValueKind::Int.coerce(&json!(" 42 ")), Some(json!(42)));
        assert_eq!(ValueKind::Int.coerce(&json!(true)), Some(json!(1)));
        assert_eq!(ValueKind::Int.coerce(&json!("a")), None);
        assert_eq!(ValueKind::Int.coerce(&json!(null)), None);
    }

    #[test]
    fn test_coerce_float() {
        assert_eq!(ValueKind::Float.coerce(&json!(2)), Some(json!(2.0)));
        assert_eq!(ValueKind::Float.coerce(&json!("2.5")), Some(json!(2.5)));
        assert_eq!(ValueKind::Float.coerce(&json!([1])), None);
    }

    #[test]
    fn test_coerce_bool() {
        assert_eq!(ValueKind::Bool.coerce(&json!("yes")), Some(json!(true)));
        assert_eq!(ValueKind::Bool.coerce(&json!("Off")), Some(json!(false)));
        assert_eq!(ValueKind::Bool.coerce(&json!(0)), Some(json!(false)));
        assert_eq!(ValueKind::Bool.coerce(&json!("maybe")), None);
    }

    #[test]
    fn test_coerce_string() {
        assert_eq!(ValueKind::String.coerce(&json!(3)), Some(json!("3")));
        assert_eq!(ValueKind::String.coerce(&json!(false)), Some(json!("false")));
        assert_eq!(ValueKind::String.coerce(&json!({"a": 1})), None);
    }

    #[test]
    fn test_type_validator_passes_unknown_keys() {
        let v = TypeValidator::new().with("port", ValueKind::Int);
        assert_eq!(v.validate("host", json!([1, 2])).unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_type_validator_rejects() {
        let v: TypeValidator = [("port", ValueKind::Int)].into_iter().collect();
        let err = v.validate("port", json!("http")).unwrap_err();
        match err {
            StoreError::Validation { key, value, msg } => {
                assert_eq!(key, "port");
                assert_eq!(value, json!("http"));
                assert_eq!(msg, "incompatible type");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
