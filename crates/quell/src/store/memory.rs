use futures_util::lock::Mutex;
use indexmap::IndexMap;

use super::{Record, StoreInner, StoreResult};

/// A store that keeps its records in memory, for the lifetime of the process.
#[derive(Default)]
pub struct InMemoryStore {
    records: Mutex<IndexMap<String, Record>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl StoreInner for InMemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Record>> {
        Ok(self.records.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, record: Record) -> StoreResult<()> {
        self.records.lock().await.insert(key.to_string(), record);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.records.lock().await.shift_remove(key);
        Ok(())
    }

    async fn clear(&self) -> StoreResult<()> {
        self.records.lock().await.clear();
        Ok(())
    }

    async fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.records.lock().await.keys().cloned().collect())
    }

    async fn merge(&self, key: &str, record: Record) -> StoreResult<()> {
        let mut records = self.records.lock().await;
        records.entry(key.to_string()).or_default().merge(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::{FieldValue, Store};

    fn record(fields: &[(&str, serde_json::Value)]) -> Record {
        fields
            .iter()
            .map(|(key, value)| (*key, FieldValue::Scalar(value.clone())))
            .collect()
    }

    #[tokio::test]
    async fn test_basic_operations() {
        let store = Store::new(InMemoryStore::new());

        store.set("character:1", record(&[("name", json!("Luke"))])).await.unwrap();
        store.set("character:2", record(&[("name", json!("Leia"))])).await.unwrap();

        assert_eq!(store.keys().await.unwrap(), ["character:1", "character:2"]);
        assert_eq!(
            store.get("character:1").await.unwrap(),
            Some(record(&[("name", json!("Luke"))]))
        );

        store.delete("character:1").await.unwrap();
        assert_eq!(store.get("character:1").await.unwrap(), None);
        assert_eq!(store.keys().await.unwrap(), ["character:2"]);

        store.clear().await.unwrap();
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_merge_is_field_level() {
        let store = Store::in_memory();

        store
            .merge("character:1", record(&[("_id", json!(1)), ("name", json!("Luke"))]))
            .await
            .unwrap();
        store
            .merge("character:1", record(&[("name", json!("Luke S")), ("mass", json!(77))]))
            .await
            .unwrap();

        assert_eq!(
            store.get("character:1").await.unwrap(),
            Some(record(&[("_id", json!(1)), ("name", json!("Luke S")), ("mass", json!(77))]))
        );
    }
}
