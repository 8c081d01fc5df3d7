use serde_json::{Map, Value};

use super::{Field, FieldCore, WithCrudEvent, field_core};
use crate::{errors::DashboardError, model::Model, request::Request};

/// Password input. The stored value is never sent back, and a blank password on update keeps
/// the current one.
#[derive(Debug, Clone)]
pub struct PasswordField {
    core: FieldCore,
}

impl PasswordField {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            core: FieldCore::new(label, "password-field"),
        }
    }
}

impl Field for PasswordField {
    field_core!();

    fn resolve_value_from_model(&mut self, _model: &Model, _request: &Request) -> Result<(), DashboardError> {
        self.core.value = Value::Null;
        Ok(())
    }

    fn crud_events(&self) -> Option<&dyn WithCrudEvent> {
        Some(self)
    }
}

impl WithCrudEvent for PasswordField {
    fn run_before_update(
        &self,
        _model: &Model,
        data: &mut Map<String, Value>,
        _request: &Request,
    ) -> Result<(), DashboardError> {
        let blank = match data.get(&self.core.attribute) {
            Some(Value::String(password)) => password.is_empty(),
            Some(Value::Null) => true,
            _ => false,
        };
        if blank {
            data.remove(&self.core.attribute);
        }
        Ok(())
    }
}
