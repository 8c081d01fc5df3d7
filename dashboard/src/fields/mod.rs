//! Fields: typed descriptors for one model attribute.
//!
//! Every field owns a [`FieldCore`] holding the shared descriptor (label, attribute, rules,
//! visibility, default, current value). The [`Field`] trait layers the per-type behaviour on
//! top: booting, resolving values from a request or a model, and extra serialized settings.
//! Builders shared by every field type live on [`FieldExt`].

mod belongs_to;
mod editable;
mod panel;
mod password;
mod read_only;
mod select;

pub use belongs_to::{BelongsToField, SearchCallback};
pub use editable::EditableField;
pub use panel::Panel;
pub use password::PasswordField;
pub use read_only::ReadOnlyField;
pub use select::SelectField;

use std::{any::Any, fmt, sync::Arc};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    errors::DashboardError,
    model::{Model, ModelDefinition},
    request::{Action, Request},
    resources::naming::attribute_from_label,
    validation::IntoRules,
};

pub type BoxedField = Box<dyn Field>;

pub type DefaultFn = Arc<dyn Fn() -> Value + Send + Sync>;

#[derive(Clone)]
pub enum DefaultValue {
    Value(Value),
    /// Produced lazily, only when the request does not carry the attribute.
    Lazy(DefaultFn),
}

impl DefaultValue {
    pub fn resolve(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Lazy(produce) => produce(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

/// Screens a field appears on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    pub index: bool,
    pub detail: bool,
    pub create: bool,
    pub update: bool,
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            index: true,
            detail: true,
            create: true,
            update: true,
        }
    }
}

impl Visibility {
    pub fn shows(&self, action: Action) -> bool {
        match action {
            Action::Index => self.index,
            Action::Detail => self.detail,
            Action::Create => self.create,
            Action::Update => self.update,
        }
    }
}

/// Descriptor state shared by every field type.
#[derive(Debug, Clone)]
pub struct FieldCore {
    pub label: String,
    pub attribute: String,
    pub value: Value,
    pub component: String,
    pub additional_information: Value,
    pub default: Option<DefaultValue>,
    pub rules: Vec<String>,
    pub rules_for_create: Vec<String>,
    pub rules_for_update: Vec<String>,
    pub readonly: bool,
    pub visibility: Visibility,
}

impl FieldCore {
    pub fn new(label: impl Into<String>, component: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            attribute: attribute_from_label(&label),
            label,
            value: Value::Null,
            component: component.into(),
            additional_information: Value::Null,
            default: None,
            rules: Vec::new(),
            rules_for_create: Vec::new(),
            rules_for_update: Vec::new(),
            readonly: false,
            visibility: Visibility::default(),
        }
    }

    /// Rules applying to `action`: the shared rules followed by the action-specific ones.
    pub fn rules_for(&self, action: Action) -> Vec<String> {
        let specific = match action {
            Action::Create => self.rules_for_create.as_slice(),
            Action::Update => self.rules_for_update.as_slice(),
            Action::Index | Action::Detail => &[],
        };
        self.rules.iter().chain(specific).cloned().collect()
    }

    /// Payload value for the attribute, falling back to the default when the key is absent.
    /// A key present with `null` stays `null`.
    pub fn value_from_request(&self, request: &Request) -> Value {
        match request.input(&self.attribute) {
            Some(value) => value.clone(),
            None => self.default.as_ref().map(DefaultValue::resolve).unwrap_or(Value::Null),
        }
    }
}

/// Per-resolution state handed to [`Field::boot`].
pub struct BootContext<'a> {
    model: Arc<ModelDefinition>,
    request: &'a Request,
    eager_loads: Vec<String>,
}

impl<'a> BootContext<'a> {
    pub fn new(model: Arc<ModelDefinition>, request: &'a Request) -> Self {
        Self {
            model,
            request,
            eager_loads: Vec::new(),
        }
    }

    pub fn model(&self) -> &Arc<ModelDefinition> {
        &self.model
    }

    pub fn request(&self) -> &'a Request {
        self.request
    }

    /// Declares a relation that must be eager-loaded on every row the fields render.
    pub fn with(&mut self, relation: impl Into<String>) {
        let relation = relation.into();
        if !self.eager_loads.contains(&relation) {
            self.eager_loads.push(relation);
        }
    }

    pub fn into_eager_loads(self) -> Vec<String> {
        self.eager_loads
    }
}

/// Lifecycle hooks a field may run around persistence.
pub trait WithCrudEvent {
    fn run_before_create(&self, _data: &mut Map<String, Value>, _request: &Request) -> Result<(), DashboardError> {
        Ok(())
    }

    fn run_after_create(&self, _record: &Value, _request: &Request) -> Result<(), DashboardError> {
        Ok(())
    }

    fn run_before_update(
        &self,
        _model: &Model,
        _data: &mut Map<String, Value>,
        _request: &Request,
    ) -> Result<(), DashboardError> {
        Ok(())
    }

    fn run_after_update(&self, _record: &Value, _request: &Request) -> Result<(), DashboardError> {
        Ok(())
    }
}

pub trait Field: Send + Sync + 'static {
    fn core(&self) -> &FieldCore;

    fn core_mut(&mut self) -> &mut FieldCore;

    fn as_any(&self) -> &dyn Any;

    /// Called once per resolution, before any value is resolved.
    fn boot(&mut self, _ctx: &mut BootContext<'_>) -> Result<(), DashboardError> {
        Ok(())
    }

    fn resolve_value_from_request(&mut self, request: &Request) -> Result<(), DashboardError> {
        let value = self.core().value_from_request(request);
        self.core_mut().value = value;
        Ok(())
    }

    fn resolve_value_from_model(&mut self, model: &Model, _request: &Request) -> Result<(), DashboardError> {
        let value = model.attribute_value(&self.core().attribute);
        self.core_mut().value = value;
        Ok(())
    }

    /// Field-specific keys merged into the serialized form.
    fn settings(&self) -> Result<Map<String, Value>, DashboardError> {
        Ok(Map::new())
    }

    /// Serialized value.
    fn value_json(&self) -> Result<Value, DashboardError> {
        Ok(self.core().value.clone())
    }

    /// Fields grouped under this one, handed out when store or update flatten the field set.
    fn take_inner_fields(&mut self) -> Option<Vec<BoxedField>> {
        None
    }

    fn crud_events(&self) -> Option<&dyn WithCrudEvent> {
        None
    }

    fn resolve(&self) -> Result<ResolvedField, DashboardError> {
        let core = self.core();
        Ok(ResolvedField {
            label: core.label.clone(),
            attribute: core.attribute.clone(),
            value: self.value_json()?,
            component: core.component.clone(),
            additional_information: core.additional_information.clone(),
            settings: self.settings()?,
        })
    }
}

/// Implements the accessor half of [`Field`] for a struct with a `core: FieldCore` member.
macro_rules! field_core {
    () => {
        fn core(&self) -> &$crate::fields::FieldCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut $crate::fields::FieldCore {
            &mut self.core
        }

        fn as_any(&self) -> &dyn ::std::any::Any {
            self
        }
    };
}
pub(crate) use field_core;

/// The unit sent to clients for one field.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedField {
    pub label: String,
    pub attribute: String,
    pub value: Value,
    pub component: String,
    pub additional_information: Value,
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

/// Builders shared by every field type.
pub trait FieldExt: Field + Sized {
    /// Overrides the attribute derived from the label.
    fn attribute(mut self, attribute: impl Into<String>) -> Self {
        self.core_mut().attribute = attribute.into();
        self
    }

    fn default(mut self, value: impl Into<Value>) -> Self {
        self.core_mut().default = Some(DefaultValue::Value(value.into()));
        self
    }

    fn default_with<F>(mut self, produce: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.core_mut().default = Some(DefaultValue::Lazy(Arc::new(produce)));
        self
    }

    fn rules(mut self, rules: impl IntoRules) -> Self {
        self.core_mut().rules = rules.into_rules();
        self
    }

    fn rules_for_create(mut self, rules: impl IntoRules) -> Self {
        self.core_mut().rules_for_create = rules.into_rules();
        self
    }

    fn rules_for_update(mut self, rules: impl IntoRules) -> Self {
        self.core_mut().rules_for_update = rules.into_rules();
        self
    }

    fn readonly(mut self) -> Self {
        self.core_mut().readonly = true;
        self
    }

    fn additional_information(mut self, information: impl Into<Value>) -> Self {
        self.core_mut().additional_information = information.into();
        self
    }

    fn hide_on_index(mut self) -> Self {
        self.core_mut().visibility.index = false;
        self
    }

    fn hide_on_detail(mut self) -> Self {
        self.core_mut().visibility.detail = false;
        self
    }

    fn hide_on_create(mut self) -> Self {
        self.core_mut().visibility.create = false;
        self
    }

    fn hide_on_update(mut self) -> Self {
        self.core_mut().visibility.update = false;
        self
    }

    fn only_on_forms(mut self) -> Self {
        self.core_mut().visibility = Visibility {
            index: false,
            detail: false,
            create: true,
            update: true,
        };
        self
    }

    fn except_on_forms(mut self) -> Self {
        self.core_mut().visibility = Visibility {
            index: true,
            detail: true,
            create: false,
            update: false,
        };
        self
    }

    fn boxed(self) -> BoxedField {
        Box::new(self)
    }
}

impl<T: Field> FieldExt for T {}

/// Serializes a field list in order.
pub fn serialize_fields(fields: &[BoxedField]) -> Result<Value, DashboardError> {
    let resolved = fields.iter().map(|field| field.resolve()).collect::<Result<Vec<_>, _>>()?;
    Ok(serde_json::to_value(resolved)?)
}

/// Replaces every grouping field by the fields it groups, recursively.
pub fn flatten_fields(fields: Vec<BoxedField>) -> Vec<BoxedField> {
    let mut flat = Vec::with_capacity(fields.len());
    for mut field in fields {
        match field.take_inner_fields() {
            Some(inner) => flat.extend(flatten_fields(inner)),
            None => flat.push(field),
        }
    }
    flat
}

/// `{attribute: value}` of every field, in order.
pub fn pluck_values(fields: &[BoxedField]) -> Result<Map<String, Value>, DashboardError> {
    fields
        .iter()
        .map(|field| Ok((field.core().attribute.clone(), field.value_json()?)))
        .collect()
}
