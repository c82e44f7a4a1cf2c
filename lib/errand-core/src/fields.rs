//! Multi-valued string maps used for headers, query parameters and form data.
//!
//! Each entry holds either a single value or a list of values. Inserting a key
//! that is already present replaces its value, keeping insertion order for
//! everything else.
//!
//! # Example
//!
//! ```
//! use errand_core::{Headers, Params};
//!
//! let headers = Headers::new()
//!     .with("Accept", "application/json")
//!     .with("X-Tags", vec!["a", "b"]);
//! assert_eq!(headers.first("Accept"), Some("application/json"));
//!
//! let params: Params = [("q", "rust"), ("page", "1")].into_iter().collect();
//! assert_eq!(params.len(), 2);
//! ```

use std::ops::Deref;

use serde_json::Value;

use crate::{Error, Result};

/// Value of a [`FieldMap`] entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldValue {
    /// A single value; replaces whatever was there.
    Single(String),
    /// A full list of values; replaces the whole value list.
    Multi(Vec<String>),
}

impl FieldValue {
    /// All values of this entry, in order.
    #[must_use]
    pub fn values(&self) -> &[String] {
        match self {
            Self::Single(value) => std::slice::from_ref(value),
            Self::Multi(values) => values,
        }
    }

    /// Convert a dynamic JSON value: a string or an array of strings.
    fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::String(value) => Some(Self::Single(value)),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(value) => Some(value),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()
                .map(Self::Multi),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<&String> for FieldValue {
    fn from(value: &String) -> Self {
        Self::Single(value.clone())
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(values: Vec<String>) -> Self {
        Self::Multi(values)
    }
}

impl From<Vec<&str>> for FieldValue {
    fn from(values: Vec<&str>) -> Self {
        Self::Multi(values.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for FieldValue {
    fn from(values: [&str; N]) -> Self {
        Self::Multi(values.into_iter().map(str::to_string).collect())
    }
}

/// Ordered map from a string key to a [`FieldValue`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldMap {
    entries: Vec<(String, FieldValue)>,
}

impl FieldMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry, replacing any previous value for the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Value of an entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    /// First value of an entry.
    #[must_use]
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(|value| value.values().first())
            .map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates over flattened `(key, value)` pairs, one per value.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().flat_map(|(key, value)| {
            value
                .values()
                .iter()
                .map(move |v| (key.as_str(), v.as_str()))
        })
    }

    /// Build a map from a dynamic JSON object whose values are strings or
    /// arrays of strings. `invalid` builds the error for a bad entry.
    fn from_json(value: Value, invalid: fn(String) -> Error) -> Result<Self> {
        let object = match value {
            Value::Object(object) => object,
            other => {
                return Err(invalid(format!(
                    "expected an object, got {}",
                    describe(&other)
                )));
            }
        };
        let mut map = Self::new();
        for (key, value) in object {
            let description = describe(&value);
            let value =
                FieldValue::from_json(value).ok_or_else(|| invalid(format!("{key}: {description}")))?;
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<K, V> FromIterator<(K, V)> for FieldMap
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

/// Short description of a JSON value shape, for error messages.
pub(crate) fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

macro_rules! field_map_type {
    ($(#[$meta:meta])* $name:ident, $invalid:path) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
        pub struct $name(FieldMap);

        impl $name {
            /// Creates an empty map.
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }

            /// Adds an entry, replacing any previous value for the same key.
            #[must_use]
            pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
                self.0.insert(key, value);
                self
            }

            /// Inserts an entry, replacing any previous value for the same key.
            pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
                self.0.insert(key, value);
            }

            /// Consume into the underlying map.
            #[must_use]
            pub fn into_inner(self) -> FieldMap {
                self.0
            }
        }

        impl Deref for $name {
            type Target = FieldMap;

            fn deref(&self) -> &FieldMap {
                &self.0
            }
        }

        impl From<FieldMap> for $name {
            fn from(map: FieldMap) -> Self {
                Self(map)
            }
        }

        impl<K, V> FromIterator<(K, V)> for $name
        where
            K: Into<String>,
            V: Into<FieldValue>,
        {
            fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
                Self(iter.into_iter().collect())
            }
        }

        impl TryFrom<Value> for $name {
            type Error = Error;

            fn try_from(value: Value) -> Result<Self> {
                FieldMap::from_json(value, $invalid).map(Self)
            }
        }
    };
}

field_map_type!(
    /// Request headers supplied by the caller.
    ///
    /// Merged onto the default header set when the request is prepared;
    /// names are matched case-insensitively at that point.
    Headers,
    Error::InvalidHeader
);

field_map_type!(
    /// Query parameters appended to the request URL.
    Params,
    Error::InvalidParam
);

field_map_type!(
    /// Form fields, sent URL-encoded or as multipart fields next to files.
    Data,
    Error::InvalidForm
);

impl Headers {
    /// First value of a header, matching the name case-insensitively.
    #[must_use]
    pub fn get_ignore_case(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, value)| value.values().first())
            .map(String::as_str)
    }
}
