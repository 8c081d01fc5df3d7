use redis::{Client, cmd};

use crate::{
    connection::{Connection, Record},
    errors::RepoError,
    keys::KeyContext,
    types::ModelKey,
};

const SCAN_COUNT: usize = 1000;

/// Stores every row as a JSON string under `{prefix}:{collection}:record:{key}`.
pub struct RedisConnection {
    client: Client,
    prefix: String,
}

impl RedisConnection {
    pub fn open(url: &str, prefix: impl Into<String>) -> Result<Self, RepoError> {
        Ok(Self {
            client: Client::open(url)?,
            prefix: prefix.into(),
        })
    }

    pub fn key_context(&self) -> KeyContext<'_> {
        KeyContext::new(&self.prefix)
    }

    fn connection(&self) -> Result<redis::Connection, RepoError> {
        Ok(self.client.get_connection()?)
    }

    fn decode(raw: &str) -> Result<Record, RepoError> {
        Ok(serde_json::from_str(raw)?)
    }
}

impl Connection for RedisConnection {
    fn driver(&self) -> &'static str {
        "redis"
    }

    fn increment(&self, collection: &str) -> Result<i64, RepoError> {
        let mut conn = self.connection()?;
        let next: i64 = cmd("INCR")
            .arg(self.key_context().sequence(collection))
            .query(&mut conn)?;
        Ok(next)
    }

    fn find(&self, collection: &str, key: &ModelKey) -> Result<Option<Record>, RepoError> {
        let mut conn = self.connection()?;
        let raw: Option<String> = cmd("GET")
            .arg(self.key_context().record(collection, &key.to_string()))
            .query(&mut conn)?;
        raw.as_deref().map(Self::decode).transpose()
    }

    fn all(&self, collection: &str) -> Result<Vec<Record>, RepoError> {
        let mut conn = self.connection()?;
        let pattern = self.key_context().collection_pattern(collection);
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let (next_cursor, batch): (u64, Vec<String>) = cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query(&mut conn)?;
            keys.extend(batch);
            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let values: Vec<Option<String>> = cmd("MGET").arg(&keys).query(&mut conn)?;
        values
            .into_iter()
            .flatten()
            .map(|raw| Self::decode(&raw))
            .collect()
    }

    fn insert(&self, collection: &str, key: &ModelKey, record: &Record) -> Result<(), RepoError> {
        let mut conn = self.connection()?;
        let payload = serde_json::to_string(record)?;
        let stored: Option<String> = cmd("SET")
            .arg(self.key_context().record(collection, &key.to_string()))
            .arg(payload)
            .arg("NX")
            .query(&mut conn)?;
        if stored.is_none() {
            return Err(RepoError::Other {
                message: format!("duplicate key `{key}` in `{collection}`").into(),
            });
        }
        if let ModelKey::Int(value) = key {
            // Keep INCR ahead of explicitly chosen keys.
            let sequence = self.key_context().sequence(collection);
            let current: Option<i64> = cmd("GET").arg(&sequence).query(&mut conn)?;
            if current.unwrap_or(0) < *value {
                let _: () = cmd("SET").arg(&sequence).arg(*value).query(&mut conn)?;
            }
        }
        Ok(())
    }

    fn replace(&self, collection: &str, key: &ModelKey, record: &Record) -> Result<(), RepoError> {
        let mut conn = self.connection()?;
        let payload = serde_json::to_string(record)?;
        let stored: Option<String> = cmd("SET")
            .arg(self.key_context().record(collection, &key.to_string()))
            .arg(payload)
            .arg("XX")
            .query(&mut conn)?;
        match stored {
            Some(_) => Ok(()),
            None => Err(RepoError::NotFound {
                key: Some(key.to_string()),
            }),
        }
    }
}
