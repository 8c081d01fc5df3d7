use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use serde_json::{Map, Value};

use super::{BootContext, Field, FieldCore, field_core, serialize_fields};
use crate::{
    errors::DashboardError,
    model::{Model, Query},
    request::Request,
    resources::{Resource, ResourceExt, naming::camel},
    types::RelationState,
};

/// Number of rows the default search returns.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Builds the query used to search related rows for a relation picker.
pub type SearchCallback = Arc<dyn Fn(Query, &Request) -> Query + Send + Sync>;

#[derive(Clone, Default)]
enum Searchable {
    #[default]
    Disabled,
    Enabled,
    With(SearchCallback),
}

/// Foreign-key relation to another resource.
///
/// The relation defaults to the camel-cased label and the attribute to `<relation>_id`. When a
/// related resource is configured the serialized field carries that resource's descriptor and
/// field set, hydrated from the eager-loaded related row. The relation is declared as an eager
/// load during [`Field::boot`]; reading a relation that was not loaded is an error, there is no
/// lazy loading.
pub struct BelongsToField {
    core: FieldCore,
    relation: String,
    related_resource: Option<String>,
    related_fields_for: Option<String>,
    searchable: Searchable,
    resolved: OnceLock<Option<Arc<dyn Resource>>>,
    request: Option<Request>,
    model: Option<Model>,
}

impl fmt::Debug for BelongsToField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BelongsToField")
            .field("attribute", &self.core.attribute)
            .field("relation", &self.relation)
            .field("related_resource", &self.related_resource)
            .field("related_fields_for", &self.related_fields_for)
            .field("searchable", &self.is_searchable())
            .finish_non_exhaustive()
    }
}

impl BelongsToField {
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        let relation = camel(&label);
        let mut core = FieldCore::new(label, "belongs-to-field");
        core.attribute = format!("{relation}_id");
        Self {
            core,
            relation,
            related_resource: None,
            related_fields_for: None,
            searchable: Searchable::Disabled,
            resolved: OnceLock::new(),
            request: None,
            model: None,
        }
    }

    /// Overrides the relation name. The attribute follows as `<relation>_id`.
    pub fn relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = relation.into();
        self.core.attribute = format!("{}_id", self.relation);
        self
    }

    /// Uri key of the resource rendered for the related row.
    pub fn related_resource(mut self, uri_key: impl Into<String>) -> Self {
        self.related_resource = Some(uri_key.into());
        self
    }

    /// Field set context used when rendering the related resource.
    pub fn related_resource_fields_for(mut self, context: impl Into<String>) -> Self {
        self.related_fields_for = Some(context.into());
        self
    }

    pub fn searchable(mut self, searchable: bool) -> Self {
        self.searchable = if searchable {
            Searchable::Enabled
        } else {
            Searchable::Disabled
        };
        self
    }

    /// Makes the field searchable through a custom query builder.
    pub fn searchable_with<F>(mut self, callback: F) -> Self
    where
        F: Fn(Query, &Request) -> Query + Send + Sync + 'static,
    {
        self.searchable = Searchable::With(Arc::new(callback));
        self
    }

    pub fn relation_name(&self) -> &str {
        &self.relation
    }

    pub fn related_fields_for(&self) -> Option<&str> {
        self.related_fields_for.as_deref()
    }

    pub fn is_searchable(&self) -> bool {
        !matches!(self.searchable, Searchable::Disabled)
    }

    /// The related resource, resolved through the request's registry on first use and
    /// memoized on this field afterwards, including the absence of one.
    pub fn resolve_related_resource(&self, request: &Request) -> Result<Option<Arc<dyn Resource>>, DashboardError> {
        if let Some(resolved) = self.resolved.get() {
            return Ok(resolved.clone());
        }
        let resolved = match &self.related_resource {
            Some(uri_key) => Some(request.registry().get(uri_key).ok_or_else(|| {
                DashboardError::InvalidResourceReference {
                    reference: uri_key.clone(),
                }
            })?),
            None => None,
        };
        Ok(self.resolved.get_or_init(|| resolved).clone())
    }

    /// The related row of the hydrated model. `Ok(None)` when no model is attached or the
    /// foreign key points nowhere.
    pub fn related_model(&self) -> Result<Option<&Model>, DashboardError> {
        let Some(model) = &self.model else {
            return Ok(None);
        };
        if !model.has_relation(&self.relation) {
            return Err(DashboardError::RelationNotConfigured {
                relation: self.relation.clone(),
                model: model.definition().name.clone(),
            });
        }
        match model.relation(&self.relation) {
            RelationState::Loaded(related) => Ok(related),
            RelationState::NotLoaded => Err(DashboardError::RelationNotLoaded {
                relation: self.relation.clone(),
            }),
        }
    }

    /// The configured search callback, or one filtering by the `id` query parameter and capped
    /// at [`DEFAULT_SEARCH_LIMIT`] rows.
    pub fn resolve_search_callback(&self) -> SearchCallback {
        match &self.searchable {
            Searchable::With(callback) => Arc::clone(callback),
            Searchable::Enabled | Searchable::Disabled => Arc::new(|query: Query, request: &Request| {
                query
                    .when(request.query("id"), |query, id| query.where_key(id))
                    .limit(DEFAULT_SEARCH_LIMIT)
            }),
        }
    }

    fn related_resource_payload(&self, request: &Request) -> Result<Option<Value>, DashboardError> {
        let Some(related) = self.resolve_related_resource(request)? else {
            return Ok(None);
        };
        let mut payload = related.descriptor().into_map();

        // Relation fields of the related resource render their descriptor only.
        if request.depth() > 0 {
            return Ok(Some(Value::Object(payload)));
        }

        let related_model = self.related_model()?;
        let nested = request.nested();
        let mut fields = related.resolve_fields_for(&nested, self.related_fields_for.as_deref())?.fields;
        if let Some(related_model) = related_model {
            for field in &mut fields {
                field.resolve_value_from_model(related_model, &nested)?;
            }
        }
        payload.insert("fields".to_string(), serialize_fields(&fields)?);
        Ok(Some(Value::Object(payload)))
    }
}

impl Field for BelongsToField {
    field_core!();

    fn boot(&mut self, ctx: &mut BootContext<'_>) -> Result<(), DashboardError> {
        ctx.with(self.relation.clone());
        self.request = Some(ctx.request().clone());
        Ok(())
    }

    fn resolve_value_from_model(&mut self, model: &Model, request: &Request) -> Result<(), DashboardError> {
        self.core.value = model.attribute_value(&self.core.attribute);
        self.model = Some(model.clone());
        self.request = Some(request.clone());
        Ok(())
    }

    fn settings(&self) -> Result<Map<String, Value>, DashboardError> {
        let mut settings = Map::new();
        settings.insert("searchable".to_string(), Value::Bool(self.is_searchable()));
        if let Some(request) = &self.request
            && let Some(payload) = self.related_resource_payload(request)?
        {
            settings.insert("relatedResource".to_string(), payload);
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        connection::MemoryConnection,
        model::ModelDefinition,
        registry::ResourceRegistry,
        request::RequestKind,
        resources::DynamicResource,
    };
    use serde_json::json;

    fn request(registry: ResourceRegistry) -> Request {
        Request::new(RequestKind::Index, Arc::new(registry), "articles")
    }

    #[test]
    fn relation_and_attribute_follow_the_label() {
        let field = BelongsToField::new("Author Name");
        assert_eq!(field.relation_name(), "authorName");
        assert_eq!(field.core().attribute, "authorName_id");

        let field = BelongsToField::new("User").relation("owner");
        assert_eq!(field.core().attribute, "owner_id");
    }

    #[test]
    fn unknown_related_resource_is_rejected() {
        let field = BelongsToField::new("User").related_resource("users");
        let resolved = field.resolve_related_resource(&request(ResourceRegistry::new()));
        assert!(matches!(
            resolved,
            Err(DashboardError::InvalidResourceReference { ref reference }) if reference == "users"
        ));
    }

    #[test]
    fn missing_related_resource_is_memoized_as_none() {
        let field = BelongsToField::new("User");
        assert!(field.resolve_related_resource(&request(ResourceRegistry::new())).unwrap().is_none());
        assert!(field.resolved.get().is_some());
    }

    #[test]
    fn related_resource_is_memoized_per_field() {
        let users = Arc::new(ModelDefinition::new("User", "users", Arc::new(MemoryConnection::new())));
        let mut registry = ResourceRegistry::new();
        registry.register(Arc::new(DynamicResource::new("User", users))).unwrap();

        let field = BelongsToField::new("User").related_resource("users");
        let first = field.resolve_related_resource(&request(registry)).unwrap().unwrap();
        let second = field
            .resolve_related_resource(&request(ResourceRegistry::new()))
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn default_search_filters_by_id_and_caps_results() {
        let field = BelongsToField::new("User");
        let callback = field.resolve_search_callback();

        let query = callback(Query::new(), &request(ResourceRegistry::new()));
        assert!(query.conditions.is_empty());
        assert_eq!(query.limit, Some(DEFAULT_SEARCH_LIMIT));

        let with_id = request(ResourceRegistry::new()).with_query([("id", "3")]);
        let query = callback(Query::new(), &with_id);
        assert_eq!(query, Query::new().where_key(3_i64).limit(DEFAULT_SEARCH_LIMIT));
    }

    #[test]
    fn custom_search_callback_makes_the_field_searchable() {
        let field = BelongsToField::new("User").searchable_with(|query, _| query.where_eq("active", true));
        assert!(field.is_searchable());
        let query = field.resolve_search_callback()(Query::new(), &request(ResourceRegistry::new()));
        assert_eq!(query, Query::new().where_eq("active", true));
        assert!(!BelongsToField::new("User").is_searchable());
        assert_eq!(field.settings().unwrap()["searchable"], json!(true));
    }
}
