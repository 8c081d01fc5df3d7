use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    connection::Record,
    errors::RepoError,
    id::generate_model_key,
    model::{KeyType, Model, ModelDefinition, Query},
    types::ModelKey,
};

/// Persistence strategy used by the store, update, index and detail controllers.
pub trait Repository: Send + Sync {
    fn create(&self, data: Map<String, Value>) -> Result<Model, RepoError>;

    fn update(&self, model: &Model, data: Map<String, Value>) -> Result<Model, RepoError>;

    /// Finds one row by key, eager-loading `relations`.
    fn find(&self, key: &ModelKey, relations: &[String]) -> Result<Option<Model>, RepoError>;

    /// Rows matching `query`, eager-loading `query.eager_loads`.
    fn get(&self, query: &Query) -> Result<Vec<Model>, RepoError>;

    fn paginate(&self, query: &Query, page: u64, per_page: u64) -> Result<Page<Model>, RepoError>;
}

/// One page of index results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub current_page: u64,
    pub per_page: u64,
}

impl<T> Page<T> {
    pub fn last_page(&self) -> u64 {
        self.total.div_ceil(self.per_page.max(1)).max(1)
    }

    /// 1-based position of the first item on the page, `None` for an empty page.
    pub fn from(&self) -> Option<u64> {
        (!self.items.is_empty()).then(|| (self.current_page - 1).saturating_mul(self.per_page).saturating_add(1))
    }

    pub fn to(&self) -> Option<u64> {
        self.from().map(|from| from.saturating_add(self.items.len() as u64 - 1))
    }
}

/// Generic create/update against a model definition and its connection.
#[derive(Debug, Clone)]
pub struct ModelRepository {
    model: Arc<ModelDefinition>,
}

impl ModelRepository {
    pub fn new(model: Arc<ModelDefinition>) -> Self {
        Self { model }
    }

    fn next_key(&self) -> Result<ModelKey, RepoError> {
        match self.model.key_type {
            KeyType::Incrementing => Ok(ModelKey::Int(self.model.connection.increment(&self.model.collection)?)),
            KeyType::Generated => Ok(ModelKey::Str(generate_model_key())),
        }
    }

    fn hydrate(&self, record: Record) -> Model {
        Model::new(Arc::clone(&self.model), record)
    }

    fn all(&self) -> Result<Vec<Model>, RepoError> {
        Ok(self
            .model
            .connection
            .all(&self.model.collection)?
            .into_iter()
            .map(|record| self.hydrate(record))
            .collect())
    }

    /// Loads every named belongs-to relation onto `models`.
    pub fn load_relations(&self, models: &mut [Model], relations: &[String]) -> Result<(), RepoError> {
        for name in relations {
            let relation = self.model.relation(name).ok_or_else(|| RepoError::UnknownRelation {
                model: self.model.name.clone(),
                relation: name.clone(),
            })?;
            let related = &relation.related;
            for model in models.iter_mut() {
                let foreign = model.attribute_value(&relation.foreign_key);
                let loaded = match ModelKey::from_value(&foreign) {
                    Some(key) if relation.owner_key == related.key_name => related
                        .connection
                        .find(&related.collection, &key)?
                        .map(|record| Model::new(Arc::clone(related), record)),
                    Some(_) => related
                        .connection
                        .all(&related.collection)?
                        .into_iter()
                        .find(|record| record.get(&relation.owner_key).is_some_and(|value| value == &foreign))
                        .map(|record| Model::new(Arc::clone(related), record)),
                    None => None,
                };
                model.set_relation(name.clone(), loaded);
            }
        }
        Ok(())
    }
}

impl Repository for ModelRepository {
    fn create(&self, mut data: Map<String, Value>) -> Result<Model, RepoError> {
        let key_name = self.model.key_name.clone();
        let key = match data.get(&key_name).and_then(ModelKey::from_value) {
            Some(key) => key,
            None => self.next_key()?,
        };
        data.insert(key_name, key.to_value());
        if self.model.timestamps {
            let now = Value::String(Utc::now().to_rfc3339());
            data.entry("created_at").or_insert_with(|| now.clone());
            data.entry("updated_at").or_insert(now);
        }
        self.model.connection.insert(&self.model.collection, &key, &data)?;
        log::debug!("created {} `{}`", self.model.name, key);
        Ok(self.hydrate(data))
    }

    fn update(&self, model: &Model, data: Map<String, Value>) -> Result<Model, RepoError> {
        let key = model.key().ok_or(RepoError::NotFound { key: None })?;
        let mut record = model.attributes().clone();
        for (attribute, value) in data {
            // The key identifies the row; it is never rewritten by an update.
            if attribute == self.model.key_name {
                continue;
            }
            record.insert(attribute, value);
        }
        if self.model.timestamps {
            record.insert("updated_at".to_string(), Value::String(Utc::now().to_rfc3339()));
        }
        self.model.connection.replace(&self.model.collection, &key, &record)?;
        log::debug!("updated {} `{}`", self.model.name, key);
        Ok(self.hydrate(record))
    }

    fn find(&self, key: &ModelKey, relations: &[String]) -> Result<Option<Model>, RepoError> {
        let Some(record) = self.model.connection.find(&self.model.collection, key)? else {
            return Ok(None);
        };
        let mut models = vec![self.hydrate(record)];
        self.load_relations(&mut models, relations)?;
        Ok(models.pop())
    }

    fn get(&self, query: &Query) -> Result<Vec<Model>, RepoError> {
        let mut models = query.apply(self.all()?);
        self.load_relations(&mut models, &query.eager_loads)?;
        Ok(models)
    }

    fn paginate(&self, query: &Query, page: u64, per_page: u64) -> Result<Page<Model>, RepoError> {
        let per_page = per_page.max(1);
        let page = page.max(1);
        let rows = query.filter_sorted(self.all()?);
        let total = rows.len() as u64;
        // Pages past the end come back empty.
        let offset = usize::try_from((page - 1).saturating_mul(per_page)).unwrap_or(usize::MAX);
        let per_page_rows = usize::try_from(per_page).unwrap_or(usize::MAX);
        let mut items: Vec<Model> = rows.into_iter().skip(offset).take(per_page_rows).collect();
        self.load_relations(&mut items, &query.eager_loads)?;
        Ok(Page {
            items,
            total,
            current_page: page,
            per_page,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connection::MemoryConnection, types::RelationState};
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn definitions() -> (Arc<ModelDefinition>, Arc<ModelDefinition>) {
        let connection: Arc<dyn crate::connection::Connection> = Arc::new(MemoryConnection::new());
        let users = Arc::new(ModelDefinition::new("User", "users", Arc::clone(&connection)));
        let articles = Arc::new(
            ModelDefinition::new("Article", "articles", connection)
                .timestamps(false)
                .belongs_to("user", &users),
        );
        (users, articles)
    }

    #[test]
    fn create_assigns_incrementing_keys_and_timestamps() {
        let (users, _) = definitions();
        let repository = ModelRepository::new(users);
        let first = repository.create(object(json!({"name": "Demo"}))).unwrap();
        let second = repository.create(object(json!({"name": "Other"}))).unwrap();
        assert_eq!(first.key(), Some(ModelKey::Int(1)));
        assert_eq!(second.key(), Some(ModelKey::Int(2)));
        assert!(first.get_attribute("created_at").is_some());
        assert!(first.get_attribute("updated_at").is_some());
    }

    #[test]
    fn generated_keys_are_strings() {
        let connection: Arc<dyn crate::connection::Connection> = Arc::new(MemoryConnection::new());
        let tokens = Arc::new(ModelDefinition::new("Token", "tokens", connection).key_type(KeyType::Generated));
        let token = ModelRepository::new(tokens).create(Map::new()).unwrap();
        assert!(matches!(token.key(), Some(ModelKey::Str(_))));
    }

    #[test]
    fn update_never_rewrites_the_key() {
        let (users, _) = definitions();
        let repository = ModelRepository::new(users);
        let user = repository.create(object(json!({"name": "Demo"}))).unwrap();
        let updated = repository
            .update(&user, object(json!({"id": 2, "name": "Renamed"})))
            .unwrap();
        assert_eq!(updated.key(), Some(ModelKey::Int(1)));
        assert_eq!(updated.attribute_value("name"), json!("Renamed"));
        assert!(repository.find(&ModelKey::Int(2), &[]).unwrap().is_none());
    }

    #[test]
    fn find_eager_loads_belongs_to() {
        let (users, articles) = definitions();
        let user = ModelRepository::new(users).create(object(json!({"name": "Author"}))).unwrap();
        let repository = ModelRepository::new(articles);
        let article = repository
            .create(object(json!({"title": "Hello", "user_id": user.key().map(|k| k.to_value())})))
            .unwrap();
        let key = article.key().unwrap();

        let without = repository.find(&key, &[]).unwrap().unwrap();
        assert!(!without.relation_loaded("user"));

        let with = repository.find(&key, &["user".to_string()]).unwrap().unwrap();
        match with.relation("user") {
            RelationState::Loaded(Some(author)) => assert_eq!(author.attribute_value("name"), json!("Author")),
            other => panic!("expected loaded author, got {:?}", other.is_loaded()),
        }
    }

    #[test]
    fn dangling_foreign_key_loads_as_none() {
        let (_, articles) = definitions();
        let repository = ModelRepository::new(articles);
        repository.create(object(json!({"title": "Orphan", "user_id": 99}))).unwrap();
        let rows = repository.get(&Query::new().with(["user"])).unwrap();
        assert!(matches!(rows[0].relation("user"), RelationState::Loaded(None)));
    }

    #[test]
    fn unknown_relation_is_reported() {
        let (users, _) = definitions();
        let repository = ModelRepository::new(users);
        repository.create(Map::new()).unwrap();
        let err = repository.get(&Query::new().with(["company"])).unwrap_err();
        assert!(matches!(err, RepoError::UnknownRelation { .. }));
    }

    #[test]
    fn paginates_with_totals() {
        let (users, _) = definitions();
        let repository = ModelRepository::new(users);
        for index in 0..5 {
            repository.create(object(json!({"name": format!("user {index}")}))).unwrap();
        }
        let page = repository.paginate(&Query::new(), 2, 2).unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.last_page(), 3);
        assert_eq!(page.from(), Some(3));
        assert_eq!(page.to(), Some(4));
        assert_eq!(page.items[0].key(), Some(ModelKey::Int(3)));
    }
    #[test]
    fn pages_far_past_the_end_are_empty() {
        let (users, _) = definitions();
        let repository = ModelRepository::new(users);
        repository.create(object(json!({"name": "Demo"}))).unwrap();
        let page = repository.paginate(&Query::new(), u64::MAX, 25).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 1);
        assert_eq!(page.current_page, u64::MAX);
        assert_eq!(page.from(), None);
    }
}
