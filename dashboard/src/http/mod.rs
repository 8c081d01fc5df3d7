//! axum adapter for the controllers.
//!
//! Controllers are synchronous and may hit storage, so every handler moves its work onto the
//! blocking pool with [`tokio::task::spawn_blocking`].

mod errors;

pub use errors::error_response;

use std::{collections::BTreeMap, sync::Arc};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::{Map, Value, json};

use crate::{
    controllers::{self, JsonResponse},
    errors::DashboardError,
    registry::ResourceRegistry,
    request::{Request, RequestKind},
    types::ModelKey,
};

/// Prefix the API is mounted under unless configured otherwise.
pub const DEFAULT_PREFIX: &str = "/dashboard-api";

type QueryParams = Query<BTreeMap<String, String>>;

#[derive(Clone)]
pub struct AppState {
    registry: Arc<ResourceRegistry>,
}

/// Routes without a prefix.
pub fn router(registry: Arc<ResourceRegistry>) -> Router {
    Router::new()
        .route("/", get(list_resources))
        .route("/{resource}", get(index).post(store))
        .route("/{resource}/fields", get(fields))
        .route("/{resource}/filters", get(filters))
        .route("/{resource}/relations/{attribute}", get(search))
        .route("/{resource}/{key}", get(detail).patch(update))
        .with_state(AppState { registry })
}

/// Routes nested under `prefix`. An empty prefix or `/` serves from the root.
pub fn app(registry: Arc<ResourceRegistry>, prefix: &str) -> Router {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return router(registry);
    }
    let prefix = if prefix.starts_with('/') {
        prefix.to_string()
    } else {
        format!("/{prefix}")
    };
    Router::new().nest(&prefix, router(registry))
}

impl IntoResponse for JsonResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        (status, Json(self.body)).into_response()
    }
}

async fn run<F>(handler: F) -> Response
where
    F: FnOnce() -> Result<JsonResponse, DashboardError> + Send + 'static,
{
    match tokio::task::spawn_blocking(handler).await {
        Ok(Ok(response)) => response.into_response(),
        Ok(Err(err)) => error_response(err),
        Err(err) => {
            log::error!("controller task failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"message": "Server Error"})),
            )
                .into_response()
        }
    }
}

/// Request bodies must be JSON objects; an empty body counts as `{}`.
fn parse_payload(body: &Bytes) -> Result<Map<String, Value>, DashboardError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(payload)) => Ok(payload),
        Ok(_) => Err(DashboardError::invalid_request("request body must be a JSON object")),
        Err(err) => Err(DashboardError::invalid_request(format!("request body is not valid JSON: {err}"))),
    }
}

async fn list_resources(State(state): State<AppState>) -> Response {
    run(move || controllers::resources(&state.registry)).await
}

async fn index(State(state): State<AppState>, Path(resource): Path<String>, Query(query): QueryParams) -> Response {
    let request = Request::new(RequestKind::Index, state.registry, resource).with_query(query);
    run(move || controllers::index(&request)).await
}

async fn store(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Query(query): QueryParams,
    body: Bytes,
) -> Response {
    let payload = match parse_payload(&body) {
        Ok(payload) => payload,
        Err(err) => return error_response(err),
    };
    let request = Request::new(RequestKind::Store, state.registry, resource)
        .with_query(query)
        .with_payload(payload);
    run(move || controllers::store(&request)).await
}

async fn fields(State(state): State<AppState>, Path(resource): Path<String>, Query(query): QueryParams) -> Response {
    let request = Request::new(RequestKind::Fields, state.registry, resource).with_query(query);
    run(move || controllers::fields(&request)).await
}

async fn filters(State(state): State<AppState>, Path(resource): Path<String>, Query(query): QueryParams) -> Response {
    let request = Request::new(RequestKind::Filters, state.registry, resource).with_query(query);
    run(move || controllers::filters(&request)).await
}

async fn search(
    State(state): State<AppState>,
    Path((resource, attribute)): Path<(String, String)>,
    Query(query): QueryParams,
) -> Response {
    let request = Request::new(RequestKind::Search, state.registry, resource).with_query(query);
    run(move || controllers::search(&request, &attribute)).await
}

async fn detail(
    State(state): State<AppState>,
    Path((resource, key)): Path<(String, String)>,
    Query(query): QueryParams,
) -> Response {
    let request = Request::new(RequestKind::Detail, state.registry, resource)
        .with_model_key(ModelKey::parse(&key))
        .with_query(query);
    run(move || controllers::detail(&request)).await
}

async fn update(
    State(state): State<AppState>,
    Path((resource, key)): Path<(String, String)>,
    Query(query): QueryParams,
    body: Bytes,
) -> Response {
    let payload = match parse_payload(&body) {
        Ok(payload) => payload,
        Err(err) => return error_response(err),
    };
    let request = Request::new(RequestKind::Update, state.registry, resource)
        .with_model_key(ModelKey::parse(&key))
        .with_query(query)
        .with_payload(payload);
    run(move || controllers::update(&request)).await
}
