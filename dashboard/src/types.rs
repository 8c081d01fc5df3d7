use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Primary key of a stored model.
///
/// Incrementing models use integer keys, every other model uses generated string keys. Route
/// segments are parsed with [`ModelKey::parse`], which prefers the integer form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelKey {
    Int(i64),
    Str(String),
}

impl ModelKey {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(value) => Self::Int(value),
            Err(_) => Self::Str(trimmed.to_string()),
        }
    }

    /// Reads a key out of a JSON attribute value.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => number.as_i64().map(Self::Int),
            Value::String(string) if !string.is_empty() => Some(Self::parse(string)),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(value) => Value::from(*value),
            Self::Str(value) => Value::String(value.clone()),
        }
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Str(value) => f.write_str(value),
        }
    }
}

impl FromStr for ModelKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<i64> for ModelKey {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for ModelKey {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Loading state of a relation on a hydrated model.
///
/// - `NotLoaded`: the relation was not eager-loaded. Reading it is a programming error.
/// - `Loaded(T)`: the relation was fetched. For a belongs-to relation `T` is `Option<Model>`,
///   `None` meaning the foreign key did not point at an existing row.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RelationState<T> {
    #[default]
    NotLoaded,
    Loaded(T),
}

impl<T> RelationState<T> {
    #[inline]
    pub fn is_loaded(&self) -> bool {
        matches!(self, RelationState::Loaded(_))
    }

    #[inline]
    pub fn as_loaded(&self) -> Option<&T> {
        match self {
            RelationState::Loaded(v) => Some(v),
            RelationState::NotLoaded => None,
        }
    }
}
