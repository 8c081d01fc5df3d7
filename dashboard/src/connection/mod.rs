//! Storage drivers.
//!
//! A [`Connection`] stores rows as JSON objects grouped by collection. It knows nothing about
//! fields, resources or relations; [`crate::repository::ModelRepository`] builds on top of it.

mod memory;
mod redis;

pub use memory::MemoryConnection;
pub use redis::RedisConnection;

use serde_json::{Map, Value};

use crate::{errors::RepoError, types::ModelKey};

pub type Record = Map<String, Value>;

pub trait Connection: Send + Sync {
    /// Short driver name used in logs and CLI output.
    fn driver(&self) -> &'static str;

    /// Next value of the collection's incrementing key sequence.
    fn increment(&self, collection: &str) -> Result<i64, RepoError>;

    fn find(&self, collection: &str, key: &ModelKey) -> Result<Option<Record>, RepoError>;

    /// Every row of the collection, in no particular order.
    fn all(&self, collection: &str) -> Result<Vec<Record>, RepoError>;

    /// Stores a new row. Fails when the key is already taken.
    fn insert(&self, collection: &str, key: &ModelKey, record: &Record) -> Result<(), RepoError>;

    /// Replaces an existing row. Fails with [`RepoError::NotFound`] when the key is unknown.
    fn replace(&self, collection: &str, key: &ModelKey, record: &Record) -> Result<(), RepoError>;
}
