//! Dashboard core library.
//!
//! Admin resources are declared as a label, a model and a list of fields. The controllers turn
//! them into index, detail, create and update endpoints: fields are filtered for the screen,
//! booted, validated against their rules, persisted through the model's repository and
//! serialized for the client.

pub mod config;
pub mod connection;
pub mod controllers;
pub mod errors;
pub mod fields;
pub mod filters;
pub mod http;
pub mod id;
pub mod keys;
pub mod model;
pub mod registry;
pub mod repository;
pub mod request;
pub mod resources;
pub mod types;
pub mod validation;
pub mod validators;

pub use config::DashboardConfig;
pub use controllers::JsonResponse;
pub use errors::*;
pub use fields::{
    BelongsToField, BoxedField, EditableField, Field, FieldExt, Panel, PasswordField, ReadOnlyField, SelectField,
};
pub use model::{Model, ModelDefinition, Query};
pub use registry::{ResourceRegistration, ResourceRegistry};
pub use request::{Action, Request, RequestKind};
pub use resources::{DynamicResource, Resource, ResourceExt};
pub use types::ModelKey;

// Re-exported for `inventory::submit!` in downstream crates.
pub use inventory;
