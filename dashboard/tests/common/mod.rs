#![allow(dead_code)]

use std::sync::Arc;

use dashboard::{
    BelongsToField, DynamicResource, EditableField, FieldExt, Model, ModelDefinition, Panel, PasswordField,
    ReadOnlyField, Request, RequestKind, Resource, ResourceRegistry,
    connection::{Connection, MemoryConnection},
    filters::SelectFilter,
    repository::Repository,
};
use serde_json::{Map, Value};

pub struct Fixture {
    pub registry: Arc<ResourceRegistry>,
    pub users: Arc<ModelDefinition>,
    pub posts: Arc<ModelDefinition>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_resources(|_, _| Vec::new())
    }

    /// Users and posts plus any extra resources built from the same models.
    pub fn with_resources<F>(extra: F) -> Self
    where
        F: FnOnce(&Arc<ModelDefinition>, &Arc<ModelDefinition>) -> Vec<Arc<dyn Resource>>,
    {
        let connection: Arc<dyn Connection> = Arc::new(MemoryConnection::new());
        let users = Arc::new(ModelDefinition::new("User", "users", Arc::clone(&connection)).hidden(["password"]));
        let posts = Arc::new(ModelDefinition::new("Post", "posts", Arc::clone(&connection)).belongs_to("user", &users));

        let mut registry = ResourceRegistry::new();
        registry.register(Arc::new(user_resource(&users))).unwrap();
        registry.register(Arc::new(post_resource(&posts))).unwrap();
        for resource in extra(&users, &posts) {
            registry.register(resource).unwrap();
        }

        Self {
            registry: Arc::new(registry),
            users,
            posts,
        }
    }

    pub fn request(&self, kind: RequestKind, resource: &str) -> Request {
        Request::new(kind, Arc::clone(&self.registry), resource)
    }

    pub fn user(&self, name: &str, country: &str) -> Model {
        self.registry
            .resolve("users")
            .unwrap()
            .repository()
            .create(object(serde_json::json!({
                "name": name,
                "email": format!("{}@example.com", name.to_lowercase()),
                "password": "hunter22",
                "city": "Utrecht",
                "country": country,
            })))
            .unwrap()
    }

    pub fn post(&self, title: &str, user_id: i64) -> Model {
        self.registry
            .resolve("posts")
            .unwrap()
            .repository()
            .create(object(serde_json::json!({"title": title, "user_id": user_id})))
            .unwrap()
    }
}

pub fn user_resource(model: &Arc<ModelDefinition>) -> DynamicResource {
    DynamicResource::new("User", Arc::clone(model))
        .with_per_page(2)
        .add_default_fields(|_| {
            vec![
                ReadOnlyField::new("ID").boxed(),
                EditableField::new("Name").rules("required|string|max:50").boxed(),
                EditableField::new("Email").rules("required|email").boxed(),
                PasswordField::new("Password")
                    .rules_for_create("required|min:8")
                    .hide_on_index()
                    .boxed(),
                Panel::new(
                    "Address",
                    vec![
                        EditableField::new("City").boxed(),
                        EditableField::new("Country").default("NL").boxed(),
                    ],
                )
                .boxed(),
            ]
        })
        .fields_for("compact", |_| {
            vec![ReadOnlyField::new("ID").boxed(), EditableField::new("Name").boxed()]
        })
        .add_filter(SelectFilter::new("Country", "country").with_options([("NL", "Netherlands"), ("BE", "Belgium")]))
}

pub fn post_resource(model: &Arc<ModelDefinition>) -> DynamicResource {
    DynamicResource::new("Post", Arc::clone(model)).add_default_fields(|_| {
        vec![
            ReadOnlyField::new("ID").boxed(),
            EditableField::new("Title").rules("required").boxed(),
            BelongsToField::new("User")
                .related_resource("users")
                .related_resource_fields_for("compact")
                .searchable(true)
                .rules("required|integer")
                .boxed(),
        ]
    })
}

pub fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// The serialized field with `attribute` from a `fields` array.
pub fn field<'a>(fields: &'a Value, attribute: &str) -> &'a Value {
    fields
        .as_array()
        .and_then(|fields| fields.iter().find(|field| field["attribute"] == attribute))
        .unwrap_or_else(|| panic!("no `{attribute}` field in {fields}"))
}

pub fn attributes(fields: &Value) -> Vec<String> {
    fields
        .as_array()
        .map(|fields| {
            fields
                .iter()
                .filter_map(|field| field["attribute"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
