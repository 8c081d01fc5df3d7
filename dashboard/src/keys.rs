/// Key-construction helpers for the Redis connection.
#[derive(Debug, Clone)]
pub struct KeyContext<'a> {
    pub prefix: &'a str,
}

impl<'a> KeyContext<'a> {
    pub fn new(prefix: &'a str) -> Self {
        Self { prefix }
    }

    pub fn record(&self, collection: &str, key: &str) -> String {
        format!("{}:{}:record:{}", self.prefix, collection, key)
    }

    /// Glob pattern matching every record of a collection.
    pub fn collection_pattern(&self, collection: &str) -> String {
        format!("{}:{}:record:*", self.prefix, collection)
    }

    /// Counter backing incrementing keys.
    pub fn sequence(&self, collection: &str) -> String {
        format!("{}:{}:sequence", self.prefix, collection)
    }
}
