use std::borrow::Cow;

use serde_json::{Map, Value};
use thiserror::Error;

/// Top-level error type returned by resource resolution and the controllers.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Validation failed for one or more attributes.
    #[error("validation failed")]
    Validation(#[from] ValidationError),

    /// Underlying repository or connection failed.
    #[error(transparent)]
    Repo(RepoError),

    /// A response payload could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A relation field was used without the eager load declared in `boot`.
    #[error("relationship {{ {relation} }} was not loaded")]
    RelationNotLoaded { relation: String },

    /// The model definition does not declare the relation a field points at.
    #[error("relation {{ {relation} }} does not exist on model `{model}`, declare the belongs-to relation on the model definition")]
    RelationNotConfigured { relation: String, model: String },

    /// A relation field references something that is not a registered resource.
    #[error("`{reference}` is not a registered resource")]
    InvalidResourceReference { reference: String },

    /// No resource is registered under the requested uri key.
    #[error("resource `{uri_key}` not found")]
    ResourceNotFound { uri_key: String },

    /// The requested model does not exist.
    #[error("{resource} `{key}` not found")]
    ModelNotFound { resource: String, key: String },

    /// The resource has no relation field with the requested attribute.
    #[error("resource `{resource}` has no relation field `{attribute}`")]
    FieldNotFound { resource: String, attribute: String },

    /// Two resources share the same uri key.
    #[error("a resource is already registered under `{uri_key}`")]
    DuplicateResource { uri_key: String },

    /// A field declares a rule the validator does not understand.
    #[error("invalid validation rule `{rule}` on `{attribute}`")]
    InvalidRule { attribute: String, rule: String },

    /// Invalid input supplied by the client.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// Invalid dashboard configuration.
    #[error("invalid configuration: {message}")]
    Config { message: Cow<'static, str> },
}

impl From<RepoError> for DashboardError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::UnknownRelation { model, relation } => Self::RelationNotConfigured { relation, model },
            other => Self::Repo(other),
        }
    }
}

impl DashboardError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest { message: message.into() }
    }

    pub fn config(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Config { message: message.into() }
    }

    /// Returns `true` for errors caused by a resource or field misconfiguration rather than
    /// by the client.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::RelationNotLoaded { .. }
                | Self::RelationNotConfigured { .. }
                | Self::InvalidResourceReference { .. }
                | Self::DuplicateResource { .. }
                | Self::InvalidRule { .. }
                | Self::Config { .. }
        )
    }
}

/// Errors raised by repositories and storage connections.
#[derive(Debug, Error)]
pub enum RepoError {
    /// Underlying Redis command failed.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A stored record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Target record was not found when performing a mutation.
    #[error("record not found")]
    NotFound { key: Option<String> },

    /// An eager load named a relation the model definition does not declare.
    #[error("model `{model}` has no relation `{relation}`")]
    UnknownRelation { model: String, relation: String },

    #[error("{message}")]
    Other { message: Cow<'static, str> },
}

/// Collection of validation issues encountered while validating a request payload.
#[derive(Debug, Error)]
#[error("validation errors: {issues:?}")]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new<I>(issues: I) -> Self
    where
        I: IntoIterator<Item = ValidationIssue>,
    {
        Self {
            issues: issues.into_iter().collect(),
        }
    }

    /// Convenience helper for constructing a single-field validation error.
    pub fn single(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new([ValidationIssue::new(field, code, message)])
    }

    /// Messages grouped by attribute, in the order the issues were raised.
    pub fn messages(&self) -> Map<String, Value> {
        let mut grouped = Map::new();
        for issue in &self.issues {
            let entry = grouped
                .entry(issue.field.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(messages) = entry {
                messages.push(Value::String(issue.message.clone()));
            }
        }
        grouped
    }
}

/// Detailed validation failure for a single attribute.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_grouped_by_attribute() {
        let error = ValidationError::new([
            ValidationIssue::new("email", "validation.required", "The email field is required."),
            ValidationIssue::new("name", "validation.min", "The name must be at least 3."),
            ValidationIssue::new("email", "validation.email", "The email must be a valid email address."),
        ]);
        let messages = error.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages["email"].as_array().map(Vec::len), Some(2));
        assert_eq!(messages["name"][0], "The name must be at least 3.");
    }

    #[test]
    fn relation_errors_are_configuration_errors() {
        let err = DashboardError::RelationNotLoaded {
            relation: "user".to_string(),
        };
        assert!(err.is_configuration_error());
        assert_eq!(err.to_string(), "relationship { user } was not loaded");
        assert!(!DashboardError::invalid_request("nope").is_configuration_error());
    }

    #[test]
    fn unknown_relations_surface_as_configuration_errors() {
        let err: DashboardError = RepoError::UnknownRelation {
            model: "Article".to_string(),
            relation: "author".to_string(),
        }
        .into();
        assert!(matches!(err, DashboardError::RelationNotConfigured { ref relation, .. } if relation == "author"));
    }
}
