use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::errors::{DashboardError, RepoError};

/// Maps a controller error onto the response the client sees.
///
/// Validation failures answer 422 with the messages grouped by attribute. Missing resources,
/// rows and relation fields answer 404, malformed input 400. Anything else is a server or
/// configuration fault: it is logged and answers 500.
pub fn error_response(err: DashboardError) -> Response {
    let (status, body) = match &err {
        DashboardError::Validation(validation) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({
                "message": "The given data was invalid.",
                "errors": validation.messages(),
            }),
        ),
        DashboardError::ResourceNotFound { .. }
        | DashboardError::ModelNotFound { .. }
        | DashboardError::FieldNotFound { .. }
        | DashboardError::Repo(RepoError::NotFound { .. }) => {
            (StatusCode::NOT_FOUND, json!({"message": err.to_string()}))
        }
        DashboardError::InvalidRequest { .. } => (StatusCode::BAD_REQUEST, json!({"message": err.to_string()})),
        _ => {
            if err.is_configuration_error() {
                log::error!("dashboard misconfiguration: {err}");
            } else {
                log::error!("request failed: {err}");
            }
            (StatusCode::INTERNAL_SERVER_ERROR, json!({"message": err.to_string()}))
        }
    };
    (status, Json(body)).into_response()
}
