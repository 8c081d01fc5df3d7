//! The per-request value handed to resources, fields and controllers.

use std::{collections::BTreeMap, sync::Arc};

use serde_json::{Map, Value};

use crate::{
    errors::DashboardError,
    registry::ResourceRegistry,
    resources::Resource,
    types::ModelKey,
};

/// Which endpoint a request was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Index,
    Detail,
    Store,
    Update,
    Fields,
    Filters,
    Search,
}

/// Screen a field can be shown or hidden on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Index,
    Detail,
    Create,
    Update,
}

impl RequestKind {
    /// Visibility used when picking fields for this kind of request. Blank forms render the
    /// create screen; searches render related rows like an index.
    pub fn action(self) -> Action {
        match self {
            Self::Index | Self::Filters | Self::Search => Action::Index,
            Self::Detail => Action::Detail,
            Self::Store | Self::Fields => Action::Create,
            Self::Update => Action::Update,
        }
    }
}

#[derive(Debug, Clone)]
struct RequestParts {
    kind: RequestKind,
    registry: Arc<ResourceRegistry>,
    resource_key: String,
    model_key: Option<ModelKey>,
    payload: Map<String, Value>,
    query: BTreeMap<String, String>,
    depth: u8,
}

/// Cheaply cloneable request. Fields keep a clone so they can resolve related resources and
/// render nested field sets against the same input.
#[derive(Debug, Clone)]
pub struct Request(Arc<RequestParts>);

impl Request {
    pub fn new(kind: RequestKind, registry: Arc<ResourceRegistry>, resource_key: impl Into<String>) -> Self {
        Self(Arc::new(RequestParts {
            kind,
            registry,
            resource_key: resource_key.into(),
            model_key: None,
            payload: Map::new(),
            query: BTreeMap::new(),
            depth: 0,
        }))
    }

    pub fn with_model_key(mut self, key: impl Into<ModelKey>) -> Self {
        Arc::make_mut(&mut self.0).model_key = Some(key.into());
        self
    }

    pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
        Arc::make_mut(&mut self.0).payload = payload;
        self
    }

    pub fn with_query<K, V>(mut self, query: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Arc::make_mut(&mut self.0)
            .query
            .extend(query.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// How many related resources deep the current rendering is.
    pub fn depth(&self) -> u8 {
        self.0.depth
    }

    /// The same request, one related resource deeper.
    pub fn nested(&self) -> Self {
        let mut nested = self.clone();
        Arc::make_mut(&mut nested.0).depth += 1;
        nested
    }

    pub fn action(&self) -> Action {
        self.0.kind.action()
    }

    pub fn registry(&self) -> &Arc<ResourceRegistry> {
        &self.0.registry
    }

    pub fn resource_key(&self) -> &str {
        &self.0.resource_key
    }

    pub fn model_key(&self) -> Option<&ModelKey> {
        self.0.model_key.as_ref()
    }

    /// The resource addressed by the route.
    pub fn resource_instance(&self) -> Result<Arc<dyn Resource>, DashboardError> {
        self.0.registry.resolve(&self.0.resource_key)
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.0.payload
    }

    pub fn input(&self, attribute: &str) -> Option<&Value> {
        self.0.payload.get(attribute)
    }

    /// Whether the payload carries the attribute, even as `null`.
    pub fn has(&self, attribute: &str) -> bool {
        self.0.payload.contains_key(attribute)
    }

    /// Query parameter value; blank values count as absent.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.0
            .query
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    pub fn fields_for(&self) -> Option<&str> {
        self.query("fieldsFor").map(str::trim)
    }

    pub fn only(&self) -> Vec<String> {
        self.comma_list("only")
    }

    pub fn except(&self) -> Vec<String> {
        self.comma_list("except")
    }

    /// Requested page, 1 when absent or unparsable.
    pub fn page(&self) -> u64 {
        self.query("page")
            .and_then(|page| page.trim().parse::<u64>().ok())
            .filter(|page| *page > 0)
            .unwrap_or(1)
    }

    /// The `filters` parameter: a JSON object mapping filter uri keys to values.
    pub fn filters(&self) -> Result<Map<String, Value>, DashboardError> {
        let Some(raw) = self.query("filters") else {
            return Ok(Map::new());
        };
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(filters)) => Ok(filters),
            Ok(_) => Err(DashboardError::invalid_request("`filters` must be a JSON object")),
            Err(err) => Err(DashboardError::invalid_request(format!("`filters` is not valid JSON: {err}"))),
        }
    }

    fn comma_list(&self, name: &str) -> Vec<String> {
        self.query(name)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(query: &[(&str, &str)]) -> Request {
        Request::new(RequestKind::Index, Arc::new(ResourceRegistry::new()), "users")
            .with_query(query.iter().map(|(k, v)| (*k, *v)))
    }

    #[test]
    fn comma_lists_tolerate_whitespace() {
        let request = request(&[("only", " first_name , email ,"), ("except", "")]);
        assert_eq!(request.only(), ["first_name", "email"]);
        assert!(request.except().is_empty());
    }

    #[test]
    fn page_defaults_to_one() {
        assert_eq!(request(&[]).page(), 1);
        assert_eq!(request(&[("page", "0")]).page(), 1);
        assert_eq!(request(&[("page", "abc")]).page(), 1);
        assert_eq!(request(&[("page", "3")]).page(), 3);
    }

    #[test]
    fn filters_must_be_a_json_object() {
        let filters = request(&[("filters", r#"{"gender":"male"}"#)]).filters().unwrap();
        assert_eq!(filters.get("gender"), Some(&json!("male")));
        assert!(request(&[("filters", "[1]")]).filters().is_err());
        assert!(request(&[("filters", "{")]).filters().is_err());
    }

    #[test]
    fn null_input_counts_as_present() {
        let payload = json!({"name": null}).as_object().cloned().unwrap();
        let request = request(&[]).with_payload(payload);
        assert!(request.has("name"));
        assert_eq!(request.input("name"), Some(&Value::Null));
        assert!(!request.has("email"));
    }

    #[test]
    fn forms_use_create_visibility() {
        assert_eq!(RequestKind::Fields.action(), Action::Create);
        assert_eq!(RequestKind::Store.action(), Action::Create);
        assert_eq!(RequestKind::Search.action(), Action::Index);
    }
}
