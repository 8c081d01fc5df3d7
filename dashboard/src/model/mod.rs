//! Model definitions and hydrated rows.
//!
//! A [`ModelDefinition`] plays the part of an ORM model class: it names the collection, the key,
//! the page size, hidden attributes and the belongs-to relations, and it is bound to the
//! [`Connection`] its rows live on. A [`Model`] is one hydrated row together with the explicit
//! loading state of each relation.

pub mod query;

use std::{collections::BTreeMap, fmt, sync::Arc};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
    connection::Connection,
    types::{ModelKey, RelationState},
};

pub use query::{Condition, Query};

/// Default number of rows per index page.
pub const DEFAULT_PER_PAGE: u64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    /// Integer keys assigned by the connection in insertion order.
    #[default]
    Incrementing,
    /// Generated string keys.
    Generated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelationKind {
    #[default]
    BelongsTo,
}

#[derive(Debug, Clone)]
pub struct RelationDescriptor {
    pub name: String,
    pub kind: RelationKind,
    pub related: Arc<ModelDefinition>,
    /// Attribute on the owning model holding the related key.
    pub foreign_key: String,
    /// Attribute on the related model the foreign key points at.
    pub owner_key: String,
}

pub struct ModelDefinition {
    pub name: String,
    pub collection: String,
    pub key_name: String,
    pub key_type: KeyType,
    pub per_page: u64,
    pub timestamps: bool,
    pub hidden: Vec<String>,
    pub relations: Vec<RelationDescriptor>,
    pub connection: Arc<dyn Connection>,
}

impl fmt::Debug for ModelDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDefinition")
            .field("name", &self.name)
            .field("collection", &self.collection)
            .field("key_name", &self.key_name)
            .field("key_type", &self.key_type)
            .field("per_page", &self.per_page)
            .field("timestamps", &self.timestamps)
            .field("hidden", &self.hidden)
            .field("relations", &self.relations.iter().map(|r| r.name.as_str()).collect::<Vec<_>>())
            .finish()
    }
}

impl ModelDefinition {
    pub fn new(name: impl Into<String>, collection: impl Into<String>, connection: Arc<dyn Connection>) -> Self {
        Self {
            name: name.into(),
            collection: collection.into(),
            key_name: "id".to_string(),
            key_type: KeyType::default(),
            per_page: DEFAULT_PER_PAGE,
            timestamps: true,
            hidden: Vec::new(),
            relations: Vec::new(),
            connection,
        }
    }

    pub fn key_name(mut self, key_name: impl Into<String>) -> Self {
        self.key_name = key_name.into();
        self
    }

    pub fn key_type(mut self, key_type: KeyType) -> Self {
        self.key_type = key_type;
        self
    }

    pub fn per_page(mut self, per_page: u64) -> Self {
        self.per_page = per_page.max(1);
        self
    }

    pub fn timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }

    pub fn hidden<S: Into<String>>(mut self, attributes: impl IntoIterator<Item = S>) -> Self {
        self.hidden = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Declares a belongs-to relation. The foreign key follows the `<relation>_id` convention
    /// and points at the related model's key.
    pub fn belongs_to(self, name: impl Into<String>, related: &Arc<ModelDefinition>) -> Self {
        let name = name.into();
        let foreign_key = format!("{name}_id");
        self.belongs_to_with_keys(name, related, foreign_key, related.key_name.clone())
    }

    pub fn belongs_to_with_keys(
        mut self,
        name: impl Into<String>,
        related: &Arc<ModelDefinition>,
        foreign_key: impl Into<String>,
        owner_key: impl Into<String>,
    ) -> Self {
        self.relations.push(RelationDescriptor {
            name: name.into(),
            kind: RelationKind::BelongsTo,
            related: Arc::clone(related),
            foreign_key: foreign_key.into(),
            owner_key: owner_key.into(),
        });
        self
    }

    pub fn relation(&self, name: &str) -> Option<&RelationDescriptor> {
        self.relations.iter().find(|relation| relation.name == name)
    }

    /// A fresh, unsaved row of this model.
    pub fn instance(self: &Arc<Self>) -> Model {
        Model::new(Arc::clone(self), Map::new())
    }
}

/// One hydrated row.
#[derive(Debug, Clone)]
pub struct Model {
    definition: Arc<ModelDefinition>,
    attributes: Map<String, Value>,
    relations: BTreeMap<String, RelationState<Option<Box<Model>>>>,
}

impl Model {
    pub fn new(definition: Arc<ModelDefinition>, attributes: Map<String, Value>) -> Self {
        Self {
            definition,
            attributes,
            relations: BTreeMap::new(),
        }
    }

    pub fn definition(&self) -> &Arc<ModelDefinition> {
        &self.definition
    }

    pub fn key(&self) -> Option<ModelKey> {
        self.attributes
            .get(&self.definition.key_name)
            .and_then(ModelKey::from_value)
    }

    pub fn get_attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Attribute value, `null` when the row has no such attribute.
    pub fn attribute_value(&self, name: &str) -> Value {
        self.attributes.get(name).cloned().unwrap_or(Value::Null)
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Whether the model definition declares the relation.
    pub fn has_relation(&self, name: &str) -> bool {
        self.definition.relation(name).is_some()
    }

    pub fn relation_loaded(&self, name: &str) -> bool {
        self.relations.get(name).is_some_and(RelationState::is_loaded)
    }

    pub fn relation(&self, name: &str) -> RelationState<Option<&Model>> {
        match self.relations.get(name) {
            Some(RelationState::Loaded(related)) => RelationState::Loaded(related.as_deref()),
            _ => RelationState::NotLoaded,
        }
    }

    pub fn set_relation(&mut self, name: impl Into<String>, related: Option<Model>) {
        self.relations
            .insert(name.into(), RelationState::Loaded(related.map(Box::new)));
    }

    /// Serializable form: every non-hidden attribute plus the loaded relations.
    pub fn to_json(&self) -> Value {
        let mut object: Map<String, Value> = self
            .attributes
            .iter()
            .filter(|(name, _)| !self.definition.hidden.iter().any(|hidden| hidden == *name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        for (name, state) in &self.relations {
            if let RelationState::Loaded(related) = state {
                let value = related.as_ref().map(|model| model.to_json()).unwrap_or(Value::Null);
                object.insert(name.clone(), value);
            }
        }
        Value::Object(object)
    }
}
