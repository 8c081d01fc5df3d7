//! Request handlers behind the HTTP routes.
//!
//! Each controller runs synchronously against a [`Request`] and returns the JSON body with its
//! status code. Errors are left to the caller; [`crate::http`] turns them into responses.

use serde_json::{Map, Value, json};

use crate::{
    errors::DashboardError,
    fields::{BelongsToField, BoxedField, Field, flatten_fields, pluck_values, serialize_fields},
    model::{Model, Query},
    registry::ResourceRegistry,
    request::Request,
    resources::{Resource, ResourceExt},
};

/// A JSON body and the status it is sent with.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonResponse {
    pub status: u16,
    pub body: Value,
}

impl JsonResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn created(body: Value) -> Self {
        Self { status: 201, body }
    }
}

/// `POST /{resource}`
pub fn store(request: &Request) -> Result<JsonResponse, DashboardError> {
    let resource = request.resource_instance()?;
    let (fields, _) = resource.resolve_validated_fields(request)?;
    let mut fields = resource.filter_non_updatable_fields(fields);
    for field in &mut fields {
        field.resolve_value_from_request(request)?;
    }

    let mut data = pluck_values(&fields)?;
    for hooks in fields.iter().filter_map(|field| field.crud_events()) {
        hooks.run_before_create(&mut data, request)?;
    }

    let record = match resource.custom_store() {
        Some(store) => store.store(data, request)?,
        None => resource.repository().create(data)?.to_json(),
    };

    for hooks in fields.iter().filter_map(|field| field.crud_events()) {
        hooks.run_after_create(&record, request)?;
    }
    log::info!("stored `{}` record", resource.uri_key());
    Ok(JsonResponse::created(record))
}

/// `PATCH /{resource}/{key}`
pub fn update(request: &Request) -> Result<JsonResponse, DashboardError> {
    let resource = request.resource_instance()?;
    let model = find_model(resource.as_ref(), request, &[])?;

    let (fields, _) = resource.resolve_validated_fields(request)?;
    let mut fields: Vec<BoxedField> = resource
        .filter_non_updatable_fields(fields)
        .into_iter()
        .filter(|field| request.has(&field.core().attribute))
        .collect();
    for field in &mut fields {
        field.resolve_value_from_request(request)?;
    }

    let mut data = pluck_values(&fields)?;
    for hooks in fields.iter().filter_map(|field| field.crud_events()) {
        hooks.run_before_update(&model, &mut data, request)?;
    }

    let record = match resource.custom_update() {
        Some(update) => update.update(&model, data, request)?,
        None => resource.repository().update(&model, data)?.to_json(),
    };

    for hooks in fields.iter().filter_map(|field| field.crud_events()) {
        hooks.run_after_update(&record, request)?;
    }
    log::info!("updated `{}` record {}", resource.uri_key(), key_label(&model));
    Ok(JsonResponse::ok(record))
}

/// `GET /{resource}`
pub fn index(request: &Request) -> Result<JsonResponse, DashboardError> {
    let resource = request.resource_instance()?;
    let eager_loads = resource.resolve_fields(request)?.eager_loads;

    let mut query = Query::new().with(eager_loads);
    let filters = resource.filters();
    for (uri_key, value) in request.filters()? {
        match filters.iter().find(|filter| filter.uri_key() == uri_key) {
            Some(filter) => query = filter.apply(query, &value, request),
            None => log::warn!("resource `{}` has no filter `{uri_key}`", resource.uri_key()),
        }
    }

    let page = resource
        .repository()
        .paginate(&query, request.page(), resource.per_page(request))?;

    let mut rows = Vec::with_capacity(page.items.len());
    for model in &page.items {
        let fields = resource.resolve_fields(request)?.fields;
        rows.push(hydrated_row(fields, request, model)?);
    }

    Ok(JsonResponse::ok(json!({
        "total": page.total,
        "currentPage": page.current_page,
        "perPage": page.per_page,
        "lastPage": page.last_page(),
        "from": page.from(),
        "to": page.to(),
        "resources": rows,
    })))
}

/// `GET /{resource}/{key}`
pub fn detail(request: &Request) -> Result<JsonResponse, DashboardError> {
    let resource = request.resource_instance()?;
    let mut collection = resource.resolve_fields(request)?;
    let model = find_model(resource.as_ref(), request, &collection.eager_loads)?;
    for field in &mut collection.fields {
        field.resolve_value_from_model(&model, request)?;
    }
    Ok(JsonResponse::ok(json!({
        "key": model.key(),
        "fields": serialize_fields(&collection.fields)?,
    })))
}

/// `GET /{resource}/fields`: the blank form, with defaults and any submitted values.
pub fn fields(request: &Request) -> Result<JsonResponse, DashboardError> {
    let resource = request.resource_instance()?;
    let mut collection = resource.resolve_fields(request)?;
    for field in &mut collection.fields {
        field.resolve_value_from_request(request)?;
    }
    Ok(JsonResponse::ok(serialize_fields(&collection.fields)?))
}

/// `GET /{resource}/filters`
pub fn filters(request: &Request) -> Result<JsonResponse, DashboardError> {
    let resource = request.resource_instance()?;
    Ok(JsonResponse::ok(serde_json::to_value(resource.filters_listing())?))
}

/// `GET /`
pub fn resources(registry: &ResourceRegistry) -> Result<JsonResponse, DashboardError> {
    Ok(JsonResponse::ok(serde_json::to_value(registry.descriptors())?))
}

/// `GET /{resource}/relations/{attribute}`: rows of the related resource for a relation picker.
pub fn search(request: &Request, attribute: &str) -> Result<JsonResponse, DashboardError> {
    let resource = request.resource_instance()?;
    let base = match request.fields_for() {
        Some(context) => resource
            .fields_for(context, request)
            .unwrap_or_else(|| resource.fields(request)),
        None => resource.fields(request),
    };
    let fields = flatten_fields(base);
    let relation = fields
        .iter()
        .filter_map(|field| field.as_any().downcast_ref::<BelongsToField>())
        .find(|relation| relation.core().attribute == attribute || relation.relation_name() == attribute)
        .ok_or_else(|| DashboardError::FieldNotFound {
            resource: resource.uri_key(),
            attribute: attribute.to_string(),
        })?;

    let related = relation.resolve_related_resource(request)?.ok_or_else(|| {
        DashboardError::invalid_request(format!("`{attribute}` has no related resource to search"))
    })?;
    let context = relation.related_fields_for();
    let eager_loads = related.resolve_fields_for(request, context)?.eager_loads;

    let search = relation.resolve_search_callback();
    let query = search(Query::new(), request).with(eager_loads);
    let models = related.repository().get(&query)?;

    let mut rows = Vec::with_capacity(models.len());
    for model in &models {
        let fields = related.resolve_fields_for(request, context)?.fields;
        rows.push(hydrated_row(fields, request, model)?);
    }
    Ok(JsonResponse::ok(Value::Array(rows)))
}

fn find_model(resource: &dyn Resource, request: &Request, eager_loads: &[String]) -> Result<Model, DashboardError> {
    let key = request
        .model_key()
        .ok_or_else(|| DashboardError::invalid_request("missing resource key"))?;
    resource
        .repository()
        .find(key, eager_loads)?
        .ok_or_else(|| DashboardError::ModelNotFound {
            resource: resource.uri_key(),
            key: key.to_string(),
        })
}

/// `{key, fields}` for one row.
fn hydrated_row(mut fields: Vec<BoxedField>, request: &Request, model: &Model) -> Result<Value, DashboardError> {
    for field in &mut fields {
        field.resolve_value_from_model(model, request)?;
    }
    let mut row = Map::new();
    row.insert("key".to_string(), model.key().map(|key| key.to_value()).unwrap_or(Value::Null));
    row.insert("fields".to_string(), serialize_fields(&fields)?);
    Ok(Value::Object(row))
}

fn key_label(model: &Model) -> String {
    model.key().map(|key| key.to_string()).unwrap_or_default()
}
