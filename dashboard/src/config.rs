//! TOML configuration for a dashboard served without writing Rust.
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8080"
//!
//! [storage]
//! driver = "redis"
//! url = "${REDIS_URL}"
//!
//! [[models]]
//! name = "User"
//!
//! [[resources]]
//! label = "User"
//! model = "User"
//! fields = [
//!     { type = "read-only", label = "ID" },
//!     { type = "editable", label = "Name", rules = "required|string|max:255" },
//! ]
//! ```

use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::Path,
    sync::Arc,
};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
    connection::{Connection, MemoryConnection, RedisConnection},
    errors::DashboardError,
    fields::{
        BelongsToField, BoxedField, EditableField, FieldExt, Panel, PasswordField, ReadOnlyField, SelectField,
    },
    filters::SelectFilter,
    http::DEFAULT_PREFIX,
    model::{KeyType, ModelDefinition},
    registry::ResourceRegistry,
    repository::{ModelRepository, Repository},
    resources::{DynamicResource, naming},
};

/// File name looked up by the CLI.
pub const CONFIG_FILE: &str = "dashboard.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub models: Vec<ModelConfig>,
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            prefix: default_prefix(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageDriver {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub driver: StorageDriver,
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Prefix of every Redis key.
    #[serde(default = "default_key_prefix")]
    pub prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            driver: StorageDriver::default(),
            url: default_redis_url(),
            prefix: default_key_prefix(),
        }
    }
}

fn default_redis_url() -> String {
    "${REDIS_URL}".to_string()
}

fn default_key_prefix() -> String {
    "dashboard".to_string()
}

impl StorageConfig {
    /// The Redis URL with a whole-value `${VAR}` reference expanded.
    pub fn redis_url(&self) -> Result<String, DashboardError> {
        let url = self.url.trim();
        match url.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
            Some(var_name) => std::env::var(var_name)
                .map_err(|_| DashboardError::config(format!("environment variable {var_name} not set"))),
            None => Ok(url.to_string()),
        }
    }

    pub fn connect(&self) -> Result<Arc<dyn Connection>, DashboardError> {
        match self.driver {
            StorageDriver::Memory => Ok(Arc::new(MemoryConnection::new())),
            StorageDriver::Redis => {
                let url = self.redis_url()?;
                Ok(Arc::new(RedisConnection::open(&url, &self.prefix)?))
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    /// Defaults to the snake-cased plural of the name.
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub key_name: Option<String>,
    #[serde(default)]
    pub key_type: KeyType,
    #[serde(default)]
    pub per_page: Option<u64>,
    #[serde(default = "default_true")]
    pub timestamps: bool,
    #[serde(default)]
    pub hidden: Vec<String>,
    #[serde(default)]
    pub relations: Vec<RelationConfig>,
    /// Rows inserted when the collection is empty.
    #[serde(default)]
    pub seed: Vec<Map<String, Value>>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelationConfig {
    pub name: String,
    pub model: String,
    #[serde(default)]
    pub foreign_key: Option<String>,
    #[serde(default)]
    pub owner_key: Option<String>,
}

impl ModelConfig {
    pub fn collection_name(&self) -> String {
        match &self.collection {
            Some(collection) => collection.clone(),
            None => naming::plural(&naming::kebab(&self.name)).replace('-', "_"),
        }
    }

    fn build(
        &self,
        connection: &Arc<dyn Connection>,
        built: &BTreeMap<String, Arc<ModelDefinition>>,
    ) -> Result<ModelDefinition, DashboardError> {
        let mut definition = ModelDefinition::new(&self.name, self.collection_name(), Arc::clone(connection))
            .key_type(self.key_type)
            .timestamps(self.timestamps)
            .hidden(self.hidden.iter().cloned());
        if let Some(key_name) = &self.key_name {
            definition = definition.key_name(key_name);
        }
        if let Some(per_page) = self.per_page {
            definition = definition.per_page(per_page);
        }
        for relation in &self.relations {
            let related = built.get(&relation.model).ok_or_else(|| {
                DashboardError::config(format!(
                    "model `{}` relation `{}` targets unknown model `{}`",
                    self.name, relation.name, relation.model
                ))
            })?;
            definition = match (&relation.foreign_key, &relation.owner_key) {
                (None, None) => definition.belongs_to(&relation.name, related),
                (foreign_key, owner_key) => definition.belongs_to_with_keys(
                    &relation.name,
                    related,
                    foreign_key.clone().unwrap_or_else(|| format!("{}_id", relation.name)),
                    owner_key.clone().unwrap_or_else(|| related.key_name.clone()),
                ),
            };
        }
        Ok(definition)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    pub label: String,
    pub model: String,
    #[serde(default)]
    pub uri_key: Option<String>,
    #[serde(default)]
    pub per_page: Option<u64>,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
    /// Named field sets selected with `fieldsFor`.
    #[serde(default)]
    pub fields_for: BTreeMap<String, Vec<FieldConfig>>,
    #[serde(default)]
    pub filters: Vec<FilterConfig>,
}

impl ResourceConfig {
    pub fn build(&self, models: &BTreeMap<String, Arc<ModelDefinition>>) -> Result<DynamicResource, DashboardError> {
        let model = models.get(&self.model).ok_or_else(|| {
            DashboardError::config(format!("resource `{}` uses unknown model `{}`", self.label, self.model))
        })?;
        for field in self.fields.iter().chain(self.fields_for.values().flatten()) {
            field.check(&self.label)?;
        }

        let fields = Arc::new(self.fields.clone());
        let mut resource =
            DynamicResource::new(&self.label, Arc::clone(model)).add_default_fields(move |_| build_fields(&fields));
        for (context, fields) in &self.fields_for {
            let fields = Arc::new(fields.clone());
            resource = resource.fields_for(context, move |_| build_fields(&fields));
        }
        for filter in &self.filters {
            resource = resource.add_filter(filter.build());
        }
        if let Some(uri_key) = &self.uri_key {
            resource = resource.with_uri_key(uri_key);
        }
        if let Some(per_page) = self.per_page {
            resource = resource.with_per_page(per_page);
        }
        Ok(resource)
    }
}

fn build_fields(fields: &[FieldConfig]) -> Vec<BoxedField> {
    fields.iter().map(FieldConfig::build).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    Editable,
    ReadOnly,
    Select,
    Password,
    BelongsTo,
    Panel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Screen {
    Index,
    Detail,
    Create,
    Update,
}

/// `"required|email"` or `["required", "regex:/a|b/"]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RulesConfig {
    One(String),
    Many(Vec<String>),
}

impl RulesConfig {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            RulesConfig::One(rules) => rules.split('|').map(str::to_string).collect(),
            RulesConfig::Many(rules) => rules.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptionConfig {
    pub value: Value,
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldConfig {
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub label: String,
    #[serde(default)]
    pub attribute: Option<String>,
    #[serde(default)]
    pub rules: Option<RulesConfig>,
    #[serde(default)]
    pub create_rules: Option<RulesConfig>,
    #[serde(default)]
    pub update_rules: Option<RulesConfig>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default)]
    pub hide_on: Vec<Screen>,
    #[serde(default)]
    pub only_on_forms: bool,
    #[serde(default)]
    pub except_on_forms: bool,
    #[serde(default)]
    pub additional_information: Option<Value>,
    /// `select` options.
    #[serde(default)]
    pub options: Vec<OptionConfig>,
    /// `belongs-to` settings.
    #[serde(default)]
    pub relation: Option<String>,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub related_fields_for: Option<String>,
    #[serde(default)]
    pub searchable: bool,
    /// `panel` members.
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

impl FieldConfig {
    pub fn build(&self) -> BoxedField {
        match self.kind {
            FieldKind::Editable => self.configure(EditableField::new(&self.label)).boxed(),
            FieldKind::ReadOnly => self.configure(ReadOnlyField::new(&self.label)).boxed(),
            FieldKind::Password => self.configure(PasswordField::new(&self.label)).boxed(),
            FieldKind::Select => {
                let options = self.options.iter().map(|option| (option.value.clone(), option.label.clone()));
                self.configure(SelectField::new(&self.label).options(options)).boxed()
            }
            FieldKind::BelongsTo => {
                let mut field = BelongsToField::new(&self.label).searchable(self.searchable);
                if let Some(relation) = &self.relation {
                    field = field.relation(relation);
                }
                if let Some(resource) = &self.resource {
                    field = field.related_resource(resource);
                }
                if let Some(context) = &self.related_fields_for {
                    field = field.related_resource_fields_for(context);
                }
                self.configure(field).boxed()
            }
            FieldKind::Panel => self.configure(Panel::new(&self.label, build_fields(&self.fields))).boxed(),
        }
    }

    fn configure<F: FieldExt>(&self, mut field: F) -> F {
        if let Some(attribute) = &self.attribute {
            field = field.attribute(attribute);
        }
        if let Some(rules) = &self.rules {
            field = field.rules(rules.to_vec());
        }
        if let Some(rules) = &self.create_rules {
            field = field.rules_for_create(rules.to_vec());
        }
        if let Some(rules) = &self.update_rules {
            field = field.rules_for_update(rules.to_vec());
        }
        if let Some(default) = &self.default {
            field = field.default(default.clone());
        }
        if let Some(information) = &self.additional_information {
            field = field.additional_information(information.clone());
        }
        if self.readonly {
            field = field.readonly();
        }
        if self.only_on_forms {
            field = field.only_on_forms();
        }
        if self.except_on_forms {
            field = field.except_on_forms();
        }
        for screen in &self.hide_on {
            field = match screen {
                Screen::Index => field.hide_on_index(),
                Screen::Detail => field.hide_on_detail(),
                Screen::Create => field.hide_on_create(),
                Screen::Update => field.hide_on_update(),
            };
        }
        field
    }

    /// Rejects settings that belong to another field type.
    fn check(&self, resource: &str) -> Result<(), DashboardError> {
        let misplaced = |setting: &str| {
            DashboardError::config(format!(
                "resource `{resource}` field `{}`: `{setting}` is not valid on a {:?} field",
                self.label, self.kind
            ))
        };
        if self.kind != FieldKind::Select && !self.options.is_empty() {
            return Err(misplaced("options"));
        }
        if self.kind != FieldKind::Panel && !self.fields.is_empty() {
            return Err(misplaced("fields"));
        }
        if self.kind != FieldKind::BelongsTo {
            if self.relation.is_some() {
                return Err(misplaced("relation"));
            }
            if self.resource.is_some() {
                return Err(misplaced("resource"));
            }
        }
        self.fields.iter().try_for_each(|field| field.check(resource))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    pub label: String,
    pub attribute: String,
    #[serde(default)]
    pub uri_key: Option<String>,
    #[serde(default)]
    pub options: Vec<OptionConfig>,
}

impl FilterConfig {
    pub fn build(&self) -> SelectFilter {
        let filter = SelectFilter::new(&self.label, &self.attribute)
            .with_options(self.options.iter().map(|option| (option.value.clone(), option.label.clone())));
        match &self.uri_key {
            Some(uri_key) => filter.with_uri_key(uri_key),
            None => filter,
        }
    }
}

impl DashboardConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, DashboardError> {
        toml::from_str(raw).map_err(|err| DashboardError::config(format!("invalid configuration: {err}")))
    }

    pub fn load(path: &Path) -> Result<Self, DashboardError> {
        let raw = fs::read_to_string(path)
            .map_err(|err| DashboardError::config(format!("failed to read {}: {err}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    /// Model definitions by name. Related models are built before the models pointing at them.
    pub fn build_models(
        &self,
        connection: &Arc<dyn Connection>,
    ) -> Result<BTreeMap<String, Arc<ModelDefinition>>, DashboardError> {
        let mut declared = BTreeSet::new();
        for model in &self.models {
            if !declared.insert(model.name.as_str()) {
                return Err(DashboardError::config(format!("model `{}` is declared twice", model.name)));
            }
        }
        for model in &self.models {
            if let Some(relation) = model.relations.iter().find(|relation| !declared.contains(relation.model.as_str())) {
                return Err(DashboardError::config(format!(
                    "model `{}` relation `{}` targets unknown model `{}`",
                    model.name, relation.name, relation.model
                )));
            }
        }

        let mut built: BTreeMap<String, Arc<ModelDefinition>> = BTreeMap::new();
        let mut pending: Vec<&ModelConfig> = self.models.iter().collect();
        while !pending.is_empty() {
            let (ready, waiting): (Vec<&ModelConfig>, Vec<&ModelConfig>) = pending.into_iter().partition(|model| {
                model
                    .relations
                    .iter()
                    .all(|relation| built.contains_key(&relation.model))
            });
            if ready.is_empty() {
                let names: Vec<&str> = waiting.iter().map(|model| model.name.as_str()).collect();
                return Err(DashboardError::config(format!(
                    "model relations form a cycle: {}",
                    names.join(", ")
                )));
            }
            for model in ready {
                let definition = model.build(connection, &built)?;
                built.insert(model.name.clone(), Arc::new(definition));
            }
            pending = waiting;
        }
        Ok(built)
    }

    /// Inserts the configured seed rows into empty collections. Returns the number of rows written.
    pub fn seed(&self, models: &BTreeMap<String, Arc<ModelDefinition>>) -> Result<usize, DashboardError> {
        let mut inserted = 0;
        for model in self.models.iter().filter(|model| !model.seed.is_empty()) {
            let Some(definition) = models.get(&model.name) else {
                continue;
            };
            if !definition.connection.all(&definition.collection)?.is_empty() {
                log::debug!("collection `{}` already has rows, skipping seed", definition.collection);
                continue;
            }
            let repository = ModelRepository::new(Arc::clone(definition));
            for row in &model.seed {
                repository.create(row.clone())?;
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    /// Connects to storage, builds and seeds the models and registers every configured resource.
    pub fn register_resources(&self, registry: &mut ResourceRegistry) -> Result<(), DashboardError> {
        let connection = self.storage.connect()?;
        let models = self.build_models(&connection)?;
        let seeded = self.seed(&models)?;
        if seeded > 0 {
            log::info!("seeded {seeded} rows");
        }
        for resource in &self.resources {
            registry.register(Arc::new(resource.build(&models)?))?;
        }
        log::info!(
            "loaded {} resources on {} storage",
            self.resources.len(),
            connection.driver()
        );
        Ok(())
    }

    pub fn build_registry(&self) -> Result<ResourceRegistry, DashboardError> {
        let mut registry = ResourceRegistry::new();
        self.register_resources(&mut registry)?;
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::Query,
        request::{Request, RequestKind},
        resources::{Resource, ResourceExt},
    };

    const CONFIG: &str = r#"
[[models]]
name = "Post"
relations = [{ name = "user", model = "User" }]

[[models]]
name = "User"
seed = [{ name = "Ada" }, { name = "Grace" }]

[[resources]]
label = "User"
model = "User"
fields = [
    { type = "read-only", label = "ID" },
    { type = "editable", label = "Name", rules = "required|string" },
    { type = "select", label = "Role", options = [{ value = "admin", label = "Admin" }], hide_on = ["index"] },
]

[[resources]]
label = "Post"
model = "Post"
fields = [
    { type = "editable", label = "Title", rules = ["required", "max:120"] },
    { type = "belongs-to", label = "User", resource = "users", searchable = true },
]
"#;

    #[test]
    fn defaults() {
        let config = DashboardConfig::from_toml_str("").unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.server.prefix, "/dashboard-api");
        assert_eq!(config.storage.driver, StorageDriver::Memory);
        assert_eq!(config.storage.url, "${REDIS_URL}");
        assert_eq!(config.storage.prefix, "dashboard");
    }

    #[test]
    fn collection_defaults_to_snake_plural() {
        let config = DashboardConfig::from_toml_str("[[models]]\nname = \"BlogPost\"").unwrap();
        assert_eq!(config.models[0].collection_name(), "blog_posts");
        assert_eq!(config.models[0].key_type, KeyType::Incrementing);
    }

    #[test]
    fn relations_are_built_after_their_targets() {
        let config = DashboardConfig::from_toml_str(CONFIG).unwrap();
        let connection: Arc<dyn Connection> = Arc::new(MemoryConnection::new());
        let models = config.build_models(&connection).unwrap();
        let relation = models["Post"].relation("user").unwrap();
        assert_eq!(relation.foreign_key, "user_id");
        assert_eq!(relation.related.name, "User");
    }

    #[test]
    fn relation_cycles_are_rejected() {
        let raw = r#"
[[models]]
name = "A"
relations = [{ name = "b", model = "B" }]

[[models]]
name = "B"
relations = [{ name = "a", model = "A" }]
"#;
        let config = DashboardConfig::from_toml_str(raw).unwrap();
        let connection: Arc<dyn Connection> = Arc::new(MemoryConnection::new());
        let err = config.build_models(&connection).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn unknown_related_models_are_rejected() {
        let raw = "[[models]]\nname = \"Post\"\nrelations = [{ name = \"user\", model = \"User\" }]";
        let config = DashboardConfig::from_toml_str(raw).unwrap();
        let connection: Arc<dyn Connection> = Arc::new(MemoryConnection::new());
        assert!(config.build_models(&connection).unwrap_err().is_configuration_error());
    }

    #[test]
    fn builds_a_seeded_registry() {
        let config = DashboardConfig::from_toml_str(CONFIG).unwrap();
        let registry = Arc::new(config.build_registry().unwrap());
        assert_eq!(registry.len(), 2);

        let users = registry.resolve("users").unwrap();
        assert_eq!(users.repository().get(&Query::new()).unwrap().len(), 2);

        let request = Request::new(RequestKind::Detail, Arc::clone(&registry), "users");
        let collection = users.resolve_fields(&request).unwrap();
        assert_eq!(collection.attributes(), vec!["id", "name", "role"]);

        let request = Request::new(RequestKind::Index, Arc::clone(&registry), "users");
        assert_eq!(users.resolve_fields(&request).unwrap().attributes(), vec!["id", "name"]);
    }

    #[test]
    fn misplaced_settings_are_rejected() {
        let raw = r#"
[[models]]
name = "User"

[[resources]]
label = "User"
model = "User"
fields = [{ type = "editable", label = "Name", options = [{ value = 1, label = "One" }] }]
"#;
        let config = DashboardConfig::from_toml_str(raw).unwrap();
        assert!(config.build_registry().unwrap_err().to_string().contains("options"));
    }

    #[test]
    fn literal_redis_urls_pass_through() {
        let storage = StorageConfig {
            url: "redis://127.0.0.1/".to_string(),
            ..StorageConfig::default()
        };
        assert_eq!(storage.redis_url().unwrap(), "redis://127.0.0.1/");

        let storage = StorageConfig {
            url: "${DASHBOARD_UNSET_TEST_VARIABLE}".to_string(),
            ..StorageConfig::default()
        };
        assert!(storage.redis_url().unwrap_err().is_configuration_error());
    }
}
