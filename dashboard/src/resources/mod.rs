//! Resources: model-backed admin screens.
//!
//! A [`Resource`] binds a [`ModelDefinition`] to its fields, named field-set contexts and
//! filters. Field resolution lives on [`ResourceExt`], implemented for every resource: it picks
//! the field set for a request, boots it, and validates payloads against the per-action rules.

mod dynamic;
pub mod naming;

pub use dynamic::{DynamicResource, FieldsFn};

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    errors::DashboardError,
    fields::{BootContext, BoxedField, flatten_fields},
    filters::{Filter, FilterDescriptor},
    model::{Model, ModelDefinition},
    repository::{ModelRepository, Repository},
    request::Request,
    validation::{AttributeRules, validate},
};

pub trait Resource: Send + Sync {
    /// Singular, human readable name, e.g. `"Blog Post"`.
    fn label(&self) -> String;

    fn model(&self) -> Arc<ModelDefinition>;

    /// The base field set, built fresh for every call.
    fn fields(&self, request: &Request) -> Vec<BoxedField>;

    /// A named alternate field set. `None` when the resource has no such context.
    fn fields_for(&self, _context: &str, _request: &Request) -> Option<Vec<BoxedField>> {
        None
    }

    /// Names accepted by [`Resource::fields_for`].
    fn contexts(&self) -> Vec<String> {
        Vec::new()
    }

    fn filters(&self) -> Vec<Arc<dyn Filter>> {
        Vec::new()
    }

    fn uri_key(&self) -> String {
        naming::uri_key(&self.label())
    }

    fn per_page(&self, _request: &Request) -> u64 {
        self.model().per_page
    }

    fn repository(&self) -> Arc<dyn Repository> {
        Arc::new(ModelRepository::new(self.model()))
    }

    fn custom_store(&self) -> Option<&dyn WithCustomStore> {
        None
    }

    fn custom_update(&self) -> Option<&dyn WithCustomUpdate> {
        None
    }
}

/// Replaces repository persistence on store.
pub trait WithCustomStore: Send + Sync {
    /// Persists `data` and returns the stored record.
    fn store(&self, data: Map<String, Value>, request: &Request) -> Result<Value, DashboardError>;
}

/// Replaces repository persistence on update.
pub trait WithCustomUpdate: Send + Sync {
    fn update(&self, model: &Model, data: Map<String, Value>, request: &Request) -> Result<Value, DashboardError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    pub name: String,
    pub label: String,
    pub uri_key: String,
}

impl ResourceDescriptor {
    pub fn into_map(self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("name".to_string(), Value::String(self.name));
        map.insert("label".to_string(), Value::String(self.label));
        map.insert("uriKey".to_string(), Value::String(self.uri_key));
        map
    }
}

/// A booted field set and the relations its fields asked to eager-load.
pub struct FieldCollection {
    pub fields: Vec<BoxedField>,
    pub eager_loads: Vec<String>,
}

impl FieldCollection {
    pub fn attributes(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.core().attribute.as_str()).collect()
    }
}

pub trait ResourceExt: Resource {
    fn descriptor(&self) -> ResourceDescriptor {
        let name = self.label();
        ResourceDescriptor {
            label: naming::plural(&name),
            uri_key: self.uri_key(),
            name,
        }
    }

    /// Field set for the request: the `fieldsFor` context (falling back to the base set), only
    /// the fields visible on the request's screen, booted, then narrowed by `only` / `except`.
    fn resolve_fields(&self, request: &Request) -> Result<FieldCollection, DashboardError> {
        let mut collection = self.resolve_fields_for(request, request.fields_for())?;

        let only = request.only();
        if !only.is_empty() {
            collection.fields.retain(|field| only.contains(&field.core().attribute));
        }
        let except = request.except();
        if !except.is_empty() {
            collection.fields.retain(|field| !except.contains(&field.core().attribute));
        }
        Ok(collection)
    }

    /// Field set for an explicit context, without the `only` / `except` narrowing.
    fn resolve_fields_for(&self, request: &Request, context: Option<&str>) -> Result<FieldCollection, DashboardError> {
        let fields = match context {
            Some(context) => self.fields_for(context, request).unwrap_or_else(|| {
                log::debug!(
                    "resource `{}` has no `{context}` field set, using the default fields",
                    self.uri_key()
                );
                self.fields(request)
            }),
            None => self.fields(request),
        };

        let action = request.action();
        let mut fields: Vec<BoxedField> = fields
            .into_iter()
            .filter(|field| field.core().visibility.shows(action))
            .collect();

        let mut ctx = BootContext::new(self.model(), request);
        for field in &mut fields {
            field.boot(&mut ctx)?;
        }
        Ok(FieldCollection {
            fields,
            eager_loads: ctx.into_eager_loads(),
        })
    }

    /// Flattened field set validated against the request payload with the rules of the
    /// request's action. Rules apply to attributes missing from the payload too.
    fn resolve_validated_fields(
        &self,
        request: &Request,
    ) -> Result<(Vec<BoxedField>, Map<String, Value>), DashboardError> {
        let fields = flatten_fields(self.resolve_fields(request)?.fields);
        let action = request.action();
        let rules: Vec<AttributeRules> = fields
            .iter()
            .map(|field| AttributeRules::new(field.core().attribute.clone(), field.core().rules_for(action)))
            .filter(|entry| !entry.rules.is_empty())
            .collect();
        validate(request.payload(), &rules)?;

        let validated = fields
            .iter()
            .filter_map(|field| {
                let attribute = &field.core().attribute;
                request.input(attribute).map(|value| (attribute.clone(), value.clone()))
            })
            .collect();
        Ok((fields, validated))
    }

    /// Drops readonly fields before persistence.
    fn filter_non_updatable_fields(&self, fields: Vec<BoxedField>) -> Vec<BoxedField> {
        fields.into_iter().filter(|field| !field.core().readonly).collect()
    }

    fn filters_listing(&self) -> Vec<FilterDescriptor> {
        self.filters()
            .iter()
            .map(|filter| FilterDescriptor::of(filter.as_ref()))
            .collect()
    }
}

impl<R: Resource + ?Sized> ResourceExt for R {}
