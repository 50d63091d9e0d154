//! The normalized store that backs the cache.
//!
//! A store is a flat key-value mapping from `type:id` keys to [`Record`]s.  Relations between
//! entities are kept as [`Reference`]s rather than inlined, so every entity has a single source
//! of truth.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

mod memory;

pub use memory::InMemoryStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store error: {0}")]
    Backend(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A set of records, keyed by store key
pub type Records = IndexMap<String, Record>;

/// The cached fields of a single entity, keyed by storage key
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<String, FieldValue>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A pointer to another record
    Reference(Reference),
    /// A typed object that has no identifier, so can't have a record of its own
    Embedded(Embedded),
    List(Vec<FieldValue>),
    Scalar(Value),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Reference {
    #[serde(rename = "__ref")]
    pub key: String,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Embedded {
    #[serde(rename = "__object")]
    pub record: Record,
}

impl Record {
    pub fn get(&self, storage_key: &str) -> Option<&FieldValue> {
        self.fields.get(storage_key)
    }

    pub fn insert(&mut self, storage_key: impl Into<String>, value: FieldValue) {
        self.fields.insert(storage_key.into(), value);
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> + '_ {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Merges another record into this one.  Fields in `other` win.
    pub fn merge(&mut self, other: Record) {
        for (key, value) in other.fields {
            match (self.fields.get_mut(&key), value) {
                (Some(FieldValue::Embedded(existing)), FieldValue::Embedded(incoming)) => {
                    existing.record.merge(incoming.record);
                }
                (_, value) => {
                    self.fields.insert(key, value);
                }
            }
        }
    }
}

impl<K: Into<String>> FromIterator<(K, FieldValue)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, FieldValue)>>(iter: T) -> Self {
        Record {
            fields: iter.into_iter().map(|(key, value)| (key.into(), value)).collect(),
        }
    }
}

impl FieldValue {
    pub fn reference(key: impl Into<String>) -> Self {
        FieldValue::Reference(Reference { key: key.into() })
    }

    /// Converts a value stored for a scalar field back into JSON.
    ///
    /// References & embedded objects aren't scalars, so those return None.
    pub fn to_scalar_json(&self) -> Option<Value> {
        match self {
            FieldValue::Scalar(value) => Some(value.clone()),
            FieldValue::List(items) => items
                .iter()
                .map(FieldValue::to_scalar_json)
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            FieldValue::Reference(_) | FieldValue::Embedded(_) => None,
        }
    }

    /// Every reference contained in this value, including inside lists
    pub fn references(&self) -> Vec<&Reference> {
        let mut references = vec![];
        let mut stack = vec![self];

        while let Some(value) = stack.pop() {
            match value {
                FieldValue::Reference(reference) => references.push(reference),
                FieldValue::List(items) => stack.extend(items.iter().rev()),
                FieldValue::Embedded(_) | FieldValue::Scalar(_) => {}
            }
        }

        references
    }
}

/// The operations a storage backend needs to provide
#[async_trait::async_trait]
pub trait StoreInner: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<Record>>;
    async fn set(&self, key: &str, record: Record) -> StoreResult<()>;
    async fn delete(&self, key: &str) -> StoreResult<()>;
    async fn clear(&self) -> StoreResult<()>;
    async fn keys(&self) -> StoreResult<Vec<String>>;

    /// Merges fields into a record, creating it if it doesn't exist.
    ///
    /// Implementations should do this atomically if they can, so concurrent writers only
    /// overwrite each other at the level of individual fields.
    async fn merge(&self, key: &str, record: Record) -> StoreResult<()> {
        let mut existing = self.get(key).await?.unwrap_or_default();
        existing.merge(record);
        self.set(key, existing).await
    }
}

#[derive(Clone)]
pub struct Store(Arc<dyn StoreInner>);

impl Store {
    pub fn new(inner: impl StoreInner + 'static) -> Self {
        Self(Arc::new(inner))
    }

    /// A store that keeps everything in memory
    pub fn in_memory() -> Self {
        Self::new(InMemoryStore::default())
    }

    /// Merges a set of records into the store, in order
    pub async fn write_records(&self, records: Records) -> StoreResult<()> {
        for (key, record) in records {
            self.merge(&key, record).await?;
        }
        Ok(())
    }
}

impl std::ops::Deref for Store {
    type Target = dyn StoreInner;
    fn deref(&self) -> &Self::Target {
        self.0.deref()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_record_serialization() {
        let record: Record = [
            ("_id", FieldValue::Scalar(json!("1"))),
            ("homeworld", FieldValue::reference("planet:1")),
            ("friends", FieldValue::List(vec![FieldValue::reference("character:2")])),
            (
                "stats",
                FieldValue::Embedded(Embedded {
                    record: [("height", FieldValue::Scalar(json!(172)))].into_iter().collect(),
                }),
            ),
        ]
        .into_iter()
        .collect();

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "_id": "1",
                "homeworld": {"__ref": "planet:1"},
                "friends": [{"__ref": "character:2"}],
                "stats": {"__object": {"height": 172}}
            })
        );

        let decoded: Record = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_merge_overwrites_fields() {
        let mut record: Record = [
            ("_id", FieldValue::Scalar(json!(1))),
            ("name", FieldValue::Scalar(json!("Luke"))),
        ]
        .into_iter()
        .collect();

        record.merge(
            [
                ("name", FieldValue::Scalar(json!("Luke Skywalker"))),
                ("homeworld", FieldValue::reference("planet:1")),
            ]
            .into_iter()
            .collect(),
        );

        let keys = record.iter().map(|(key, _)| key).collect::<Vec<_>>();
        assert_eq!(keys, ["_id", "name", "homeworld"]);
        assert_eq!(record.get("name"), Some(&FieldValue::Scalar(json!("Luke Skywalker"))));
    }

    #[test]
    fn test_references_are_found_in_lists() {
        let value = FieldValue::List(vec![
            FieldValue::reference("character:1"),
            FieldValue::List(vec![FieldValue::reference("character:2")]),
            FieldValue::Scalar(json!(null)),
        ]);

        let keys = value.references().into_iter().map(|r| r.key.as_str()).collect::<Vec<_>>();
        assert_eq!(keys, ["character:1", "character:2"]);
    }

    #[test]
    fn test_scalar_json() {
        let list = FieldValue::List(vec![FieldValue::Scalar(json!("a")), FieldValue::Scalar(json!("b"))]);
        assert_eq!(list.to_scalar_json(), Some(json!(["a", "b"])));
        assert_eq!(FieldValue::reference("planet:1").to_scalar_json(), None);
    }
}
