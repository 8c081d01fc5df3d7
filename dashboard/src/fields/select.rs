use serde_json::{Value, json};

use super::{Field, FieldCore, field_core};

/// Choice between fixed options. The options travel to the client as the field's additional
/// information: `[{"value": .., "label": ..}]`.
#[derive(Debug, Clone)]
pub struct SelectField {
    core: FieldCore,
}

impl SelectField {
    pub fn new(label: impl Into<String>) -> Self {
        let mut core = FieldCore::new(label, "select-field");
        core.additional_information = Value::Array(Vec::new());
        Self { core }
    }

    pub fn options<V, L>(mut self, options: impl IntoIterator<Item = (V, L)>) -> Self
    where
        V: Into<Value>,
        L: Into<String>,
    {
        self.core.additional_information = Value::Array(
            options
                .into_iter()
                .map(|(value, label)| json!({"value": value.into(), "label": label.into()}))
                .collect(),
        );
        self
    }

    /// Option values, in order.
    pub fn option_values(&self) -> Vec<Value> {
        self.core
            .additional_information
            .as_array()
            .map(|options| options.iter().map(|option| option["value"].clone()).collect())
            .unwrap_or_default()
    }
}

impl Field for SelectField {
    field_core!();
}
