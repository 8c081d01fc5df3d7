//! Index filters.
//!
//! The index endpoint reads the `filters` query parameter as a JSON object mapping filter uri
//! keys to the selected value and lets each named filter narrow the query.

use serde::Serialize;
use serde_json::{Value, json};

use crate::{model::Query, request::Request, resources::naming::kebab};

pub trait Filter: Send + Sync {
    fn label(&self) -> String;

    fn uri_key(&self) -> String {
        kebab(&self.label())
    }

    fn component(&self) -> String {
        "select-filter".to_string()
    }

    /// Choices offered to the client.
    fn options(&self) -> Value {
        Value::Array(Vec::new())
    }

    fn apply(&self, query: Query, value: &Value, request: &Request) -> Query;
}

/// One entry of a resource's filter listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterDescriptor {
    pub label: String,
    pub uri_key: String,
    pub component: String,
    pub options: Value,
}

impl FilterDescriptor {
    pub fn of(filter: &dyn Filter) -> Self {
        Self {
            label: filter.label(),
            uri_key: filter.uri_key(),
            component: filter.component(),
            options: filter.options(),
        }
    }
}

/// Equality filter on one attribute with a fixed set of options. An array value matches any
/// of its items; `null` or an empty string leaves the query untouched.
#[derive(Debug, Clone)]
pub struct SelectFilter {
    label: String,
    attribute: String,
    uri_key: Option<String>,
    options: Vec<(Value, String)>,
}

impl SelectFilter {
    pub fn new(label: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            attribute: attribute.into(),
            uri_key: None,
            options: Vec::new(),
        }
    }

    pub fn with_uri_key(mut self, uri_key: impl Into<String>) -> Self {
        self.uri_key = Some(uri_key.into());
        self
    }

    pub fn with_options<V, L>(mut self, options: impl IntoIterator<Item = (V, L)>) -> Self
    where
        V: Into<Value>,
        L: Into<String>,
    {
        self.options = options
            .into_iter()
            .map(|(value, label)| (value.into(), label.into()))
            .collect();
        self
    }
}

impl Filter for SelectFilter {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn uri_key(&self) -> String {
        self.uri_key.clone().unwrap_or_else(|| kebab(&self.label))
    }

    fn options(&self) -> Value {
        Value::Array(
            self.options
                .iter()
                .map(|(value, label)| json!({"value": value, "label": label}))
                .collect(),
        )
    }

    fn apply(&self, query: Query, value: &Value, _request: &Request) -> Query {
        match value {
            Value::Null => query,
            Value::String(selected) if selected.is_empty() => query,
            Value::Array(values) if values.is_empty() => query,
            Value::Array(values) => query.where_in(self.attribute.clone(), values.iter().cloned()),
            selected => query.where_eq(self.attribute.clone(), selected.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{registry::ResourceRegistry, request::RequestKind};

    fn gender() -> SelectFilter {
        SelectFilter::new("Gender", "gender").with_options([("male", "Male"), ("female", "Female")])
    }

    #[test]
    fn describes_itself() {
        let descriptor = serde_json::to_value(FilterDescriptor::of(&gender())).unwrap();
        assert_eq!(
            descriptor,
            json!({
                "label": "Gender",
                "uriKey": "gender",
                "component": "select-filter",
                "options": [{"value": "male", "label": "Male"}, {"value": "female", "label": "Female"}],
            })
        );
    }

    #[test]
    fn applies_equality_or_membership() {
        let request = Request::new(RequestKind::Index, Arc::new(ResourceRegistry::new()), "users");
        let filter = gender();
        assert_eq!(filter.apply(Query::new(), &json!("male"), &request), Query::new().where_eq("gender", "male"));
        assert_eq!(
            filter.apply(Query::new(), &json!(["male", "female"]), &request),
            Query::new().where_in("gender", ["male", "female"])
        );
        assert_eq!(filter.apply(Query::new(), &json!(""), &request), Query::new());
    }
}
