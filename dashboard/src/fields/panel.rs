use std::fmt;

use serde_json::Value;

use super::{BootContext, BoxedField, Field, FieldCore, field_core, serialize_fields};
use crate::{errors::DashboardError, model::Model, request::Request};

/// Presentation group of fields.
///
/// The panel's value is its inner field list. Store and update flatten panels away, so a panel
/// never persists an attribute of its own.
pub struct Panel {
    core: FieldCore,
    fields: Vec<BoxedField>,
}

impl fmt::Debug for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Panel")
            .field("label", &self.core.label)
            .field(
                "fields",
                &self.fields.iter().map(|field| field.core().attribute.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Panel {
    pub fn new(label: impl Into<String>, fields: Vec<BoxedField>) -> Self {
        Self {
            core: FieldCore::new(label, "panel"),
            fields,
        }
    }

    pub fn fields(&self) -> &[BoxedField] {
        &self.fields
    }
}

impl Field for Panel {
    field_core!();

    fn boot(&mut self, ctx: &mut BootContext<'_>) -> Result<(), DashboardError> {
        let action = ctx.request().action();
        self.fields.retain(|field| field.core().visibility.shows(action));
        for field in &mut self.fields {
            field.boot(ctx)?;
        }
        Ok(())
    }

    fn resolve_value_from_request(&mut self, request: &Request) -> Result<(), DashboardError> {
        for field in &mut self.fields {
            field.resolve_value_from_request(request)?;
        }
        Ok(())
    }

    fn resolve_value_from_model(&mut self, model: &Model, request: &Request) -> Result<(), DashboardError> {
        for field in &mut self.fields {
            field.resolve_value_from_model(model, request)?;
        }
        Ok(())
    }

    fn value_json(&self) -> Result<Value, DashboardError> {
        serialize_fields(&self.fields)
    }

    fn take_inner_fields(&mut self) -> Option<Vec<BoxedField>> {
        Some(std::mem::take(&mut self.fields))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        connection::MemoryConnection,
        fields::{EditableField, FieldExt, PasswordField, flatten_fields},
        model::ModelDefinition,
        registry::ResourceRegistry,
        request::RequestKind,
    };
    use serde_json::json;

    fn panel() -> Panel {
        Panel::new(
            "Personal Information",
            vec![
                EditableField::new("Name").boxed(),
                EditableField::new("Email").boxed(),
                PasswordField::new("Password").only_on_forms().boxed(),
            ],
        )
    }

    #[test]
    fn attribute_comes_from_the_label() {
        assert_eq!(panel().core().attribute, "personal_information");
    }

    #[test]
    fn boot_drops_inner_fields_hidden_on_the_screen() {
        let users = Arc::new(ModelDefinition::new("User", "users", Arc::new(MemoryConnection::new())));
        let request = Request::new(RequestKind::Detail, Arc::new(ResourceRegistry::new()), "users");
        let mut ctx = BootContext::new(users, &request);
        let mut panel = panel();
        panel.boot(&mut ctx).unwrap();
        assert_eq!(panel.fields().len(), 2);
    }

    #[test]
    fn value_is_the_serialized_inner_fields() {
        let users = Arc::new(ModelDefinition::new("User", "users", Arc::new(MemoryConnection::new())));
        let request = Request::new(RequestKind::Detail, Arc::new(ResourceRegistry::new()), "users");
        let model = Model::new(
            users,
            json!({"id": 1, "name": "Demo", "email": "demo@email.com", "password": "hash"})
                .as_object()
                .cloned()
                .unwrap(),
        );
        let mut panel = panel();
        panel.resolve_value_from_model(&model, &request).unwrap();
        let resolved = serde_json::to_value(panel.resolve().unwrap()).unwrap();
        assert_eq!(resolved["component"], "panel");
        assert_eq!(resolved["value"][0]["value"], "Demo");
        assert_eq!(resolved["value"][1]["attribute"], "email");
        assert_eq!(resolved["value"][2]["value"], Value::Null);
    }

    #[test]
    fn flattening_replaces_the_panel_by_its_fields() {
        let fields = flatten_fields(vec![EditableField::new("Gender").boxed(), panel().boxed()]);
        let attributes: Vec<_> = fields.iter().map(|field| field.core().attribute.clone()).collect();
        assert_eq!(attributes, ["gender", "name", "email", "password"]);
    }
}
