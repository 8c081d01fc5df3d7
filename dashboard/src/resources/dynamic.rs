use std::{collections::BTreeMap, fmt, sync::Arc};

use super::{Resource, WithCustomStore, WithCustomUpdate};
use crate::{
    fields::BoxedField,
    filters::Filter,
    model::ModelDefinition,
    repository::{ModelRepository, Repository},
    request::Request,
};

/// Builds a field set for a request.
pub type FieldsFn = Arc<dyn Fn(&Request) -> Vec<BoxedField> + Send + Sync>;

/// Resource assembled with builder calls instead of a dedicated type.
///
/// ```
/// use std::sync::Arc;
///
/// use dashboard::{
///     connection::MemoryConnection,
///     fields::{EditableField, FieldExt, ReadOnlyField},
///     model::ModelDefinition,
///     resources::{DynamicResource, Resource, ResourceExt},
/// };
///
/// let users = Arc::new(ModelDefinition::new("User", "users", Arc::new(MemoryConnection::new())));
/// let resource = DynamicResource::new("User", users)
///     .add_default_fields(|_| vec![ReadOnlyField::new("ID").boxed(), EditableField::new("Name").boxed()])
///     .fields_for("compact", |_| vec![EditableField::new("Name").boxed()]);
///
/// assert_eq!(resource.uri_key(), "users");
/// assert_eq!(resource.descriptor().label, "Users");
/// ```
#[derive(Clone)]
pub struct DynamicResource {
    label: String,
    model: Arc<ModelDefinition>,
    uri_key: Option<String>,
    per_page: Option<u64>,
    fields: Option<FieldsFn>,
    contexts: BTreeMap<String, FieldsFn>,
    filters: Vec<Arc<dyn Filter>>,
    repository: Option<Arc<dyn Repository>>,
    custom_store: Option<Arc<dyn WithCustomStore>>,
    custom_update: Option<Arc<dyn WithCustomUpdate>>,
}

impl fmt::Debug for DynamicResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicResource")
            .field("label", &self.label)
            .field("model", &self.model.name)
            .field("uri_key", &self.uri_key())
            .field("contexts", &self.contexts.keys().collect::<Vec<_>>())
            .field("filters", &self.filters.len())
            .finish_non_exhaustive()
    }
}

impl DynamicResource {
    pub fn new(label: impl Into<String>, model: Arc<ModelDefinition>) -> Self {
        Self {
            label: label.into(),
            model,
            uri_key: None,
            per_page: None,
            fields: None,
            contexts: BTreeMap::new(),
            filters: Vec::new(),
            repository: None,
            custom_store: None,
            custom_update: None,
        }
    }

    pub fn with_uri_key(mut self, uri_key: impl Into<String>) -> Self {
        self.uri_key = Some(uri_key.into());
        self
    }

    pub fn with_per_page(mut self, per_page: u64) -> Self {
        self.per_page = Some(per_page.max(1));
        self
    }

    pub fn add_default_fields<F>(mut self, fields: F) -> Self
    where
        F: Fn(&Request) -> Vec<BoxedField> + Send + Sync + 'static,
    {
        self.fields = Some(Arc::new(fields));
        self
    }

    /// Registers a named field set selectable with the `fieldsFor` query parameter.
    pub fn fields_for<F>(mut self, context: impl Into<String>, fields: F) -> Self
    where
        F: Fn(&Request) -> Vec<BoxedField> + Send + Sync + 'static,
    {
        self.contexts.insert(context.into(), Arc::new(fields));
        self
    }

    pub fn add_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    pub fn use_repository(mut self, repository: Arc<dyn Repository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn use_custom_store(mut self, store: impl WithCustomStore + 'static) -> Self {
        self.custom_store = Some(Arc::new(store));
        self
    }

    pub fn use_custom_update(mut self, update: impl WithCustomUpdate + 'static) -> Self {
        self.custom_update = Some(Arc::new(update));
        self
    }
}

impl Resource for DynamicResource {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn model(&self) -> Arc<ModelDefinition> {
        Arc::clone(&self.model)
    }

    fn fields(&self, request: &Request) -> Vec<BoxedField> {
        self.fields.as_ref().map(|fields| fields(request)).unwrap_or_default()
    }

    fn fields_for(&self, context: &str, request: &Request) -> Option<Vec<BoxedField>> {
        self.contexts.get(context).map(|fields| fields(request))
    }

    fn contexts(&self) -> Vec<String> {
        self.contexts.keys().cloned().collect()
    }

    fn filters(&self) -> Vec<Arc<dyn Filter>> {
        self.filters.clone()
    }

    fn uri_key(&self) -> String {
        self.uri_key
            .clone()
            .unwrap_or_else(|| super::naming::uri_key(&self.label))
    }

    fn per_page(&self, _request: &Request) -> u64 {
        self.per_page.unwrap_or(self.model.per_page)
    }

    fn repository(&self) -> Arc<dyn Repository> {
        match &self.repository {
            Some(repository) => Arc::clone(repository),
            None => Arc::new(ModelRepository::new(Arc::clone(&self.model))),
        }
    }

    fn custom_store(&self) -> Option<&dyn WithCustomStore> {
        self.custom_store.as_deref()
    }

    fn custom_update(&self) -> Option<&dyn WithCustomUpdate> {
        self.custom_update.as_deref()
    }
}
