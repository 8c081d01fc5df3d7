use std::cmp::Ordering;

use serde_json::Value;

use crate::{
    model::Model,
    types::{ModelKey, SortOrder},
};

/// A single row predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Primary key equality.
    Key(ModelKey),
    Equals { attribute: String, value: Value },
    In { attribute: String, values: Vec<Value> },
    /// Case-insensitive substring match on a string attribute.
    Contains { attribute: String, needle: String },
}

impl Condition {
    pub fn matches(&self, model: &Model) -> bool {
        match self {
            Self::Key(key) => model.key().is_some_and(|candidate| &candidate == key),
            Self::Equals { attribute, value } => model
                .get_attribute(attribute)
                .is_some_and(|candidate| loosely_equal(candidate, value)),
            Self::In { attribute, values } => model
                .get_attribute(attribute)
                .is_some_and(|candidate| values.iter().any(|value| loosely_equal(candidate, value))),
            Self::Contains { attribute, needle } => model
                .get_attribute(attribute)
                .and_then(Value::as_str)
                .is_some_and(|candidate| candidate.to_lowercase().contains(&needle.to_lowercase())),
        }
    }
}

/// Row selection: conditions, eager loads, ordering and slicing.
///
/// ```
/// use dashboard::model::Query;
///
/// let query = Query::new()
///     .with(["user"])
///     .where_eq("gender", "male")
///     .when(Some("1"), |query, id| query.where_key(id))
///     .limit(10);
/// assert_eq!(query.conditions.len(), 2);
/// assert_eq!(query.eager_loads, vec!["user".to_string()]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub conditions: Vec<Condition>,
    pub eager_loads: Vec<String>,
    pub limit: Option<usize>,
    pub offset: usize,
    pub order: Option<(String, SortOrder)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Relations to eager-load on every returned row.
    pub fn with<S: Into<String>>(mut self, relations: impl IntoIterator<Item = S>) -> Self {
        for relation in relations {
            let relation = relation.into();
            if !self.eager_loads.contains(&relation) {
                self.eager_loads.push(relation);
            }
        }
        self
    }

    pub fn where_key(mut self, key: impl Into<ModelKey>) -> Self {
        self.conditions.push(Condition::Key(key.into()));
        self
    }

    pub fn where_eq(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Equals {
            attribute: attribute.into(),
            value: value.into(),
        });
        self
    }

    pub fn where_in<V: Into<Value>>(mut self, attribute: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        self.conditions.push(Condition::In {
            attribute: attribute.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn where_contains(mut self, attribute: impl Into<String>, needle: impl Into<String>) -> Self {
        self.conditions.push(Condition::Contains {
            attribute: attribute.into(),
            needle: needle.into(),
        });
        self
    }

    /// Applies `apply` only when `value` is present.
    pub fn when<T, F>(self, value: Option<T>, apply: F) -> Self
    where
        F: FnOnce(Self, T) -> Self,
    {
        match value {
            Some(value) => apply(self, value),
            None => self,
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn order_by(mut self, attribute: impl Into<String>, order: SortOrder) -> Self {
        self.order = Some((attribute.into(), order));
        self
    }

    pub fn matches(&self, model: &Model) -> bool {
        self.conditions.iter().all(|condition| condition.matches(model))
    }

    /// Filters and sorts `models` without slicing. Rows are ordered by key unless an explicit
    /// order is set.
    pub fn filter_sorted(&self, models: Vec<Model>) -> Vec<Model> {
        let mut rows: Vec<Model> = models.into_iter().filter(|model| self.matches(model)).collect();
        match &self.order {
            Some((attribute, order)) => rows.sort_by(|a, b| {
                let ordering = compare_values(
                    a.get_attribute(attribute).unwrap_or(&Value::Null),
                    b.get_attribute(attribute).unwrap_or(&Value::Null),
                );
                match order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            }),
            None => rows.sort_by_key(Model::key),
        }
        rows
    }

    /// Filters, sorts and slices `models` by offset and limit.
    pub fn apply(&self, models: Vec<Model>) -> Vec<Model> {
        let rows = self.filter_sorted(models).into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => rows.take(limit).collect(),
            None => rows.collect(),
        }
    }
}

fn loosely_equal(candidate: &Value, expected: &Value) -> bool {
    match (candidate, expected) {
        (Value::Number(_), Value::String(raw)) | (Value::String(raw), Value::Number(_)) => {
            let number = if candidate.is_number() { candidate } else { expected };
            number.to_string() == raw.trim()
        }
        _ => candidate == expected,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => a.to_string().cmp(&b.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connection::MemoryConnection, model::ModelDefinition};
    use serde_json::json;
    use std::sync::Arc;

    fn rows() -> Vec<Model> {
        let users = Arc::new(ModelDefinition::new("User", "users", Arc::new(MemoryConnection::new())));
        [
            json!({"id": 3, "name": "Carol", "gender": "female"}),
            json!({"id": 1, "name": "Alice", "gender": "female"}),
            json!({"id": 2, "name": "Bob", "gender": "male"}),
        ]
        .into_iter()
        .map(|value| Model::new(Arc::clone(&users), value.as_object().cloned().unwrap_or_default()))
        .collect()
    }

    fn names(models: &[Model]) -> Vec<String> {
        models
            .iter()
            .map(|model| model.attribute_value("name").as_str().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn orders_by_key_by_default() {
        assert_eq!(names(&Query::new().apply(rows())), ["Alice", "Bob", "Carol"]);
    }

    #[test]
    fn filters_and_slices() {
        let query = Query::new().where_eq("gender", "female").offset(1).limit(1);
        assert_eq!(names(&query.apply(rows())), ["Carol"]);
    }

    #[test]
    fn key_condition_accepts_string_input() {
        let query = Query::new().where_key("2");
        assert_eq!(names(&query.apply(rows())), ["Bob"]);
    }

    #[test]
    fn contains_is_case_insensitive() {
        let query = Query::new().where_contains("name", "AR");
        assert_eq!(names(&query.apply(rows())), ["Carol"]);
    }

    #[test]
    fn explicit_order_wins() {
        let query = Query::new().order_by("name", SortOrder::Desc);
        assert_eq!(names(&query.apply(rows())), ["Carol", "Bob", "Alice"]);
    }

    #[test]
    fn loose_equality_bridges_numbers_and_strings() {
        assert!(loosely_equal(&json!(1), &json!("1")));
        assert!(loosely_equal(&json!("2"), &json!(2)));
        assert!(!loosely_equal(&json!(1), &json!(true)));
    }
}
