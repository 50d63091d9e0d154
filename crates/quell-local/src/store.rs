use std::{io, path::PathBuf};

use quell::{Record, Records, StorageBackend, Store, StoreInner, StoreResult};
use tokio::sync::Mutex;

/// Builds the store an options [`StorageBackend`] asks for
pub async fn open_store(backend: &StorageBackend) -> StoreResult<Store> {
    Ok(match backend {
        StorageBackend::Memory => Store::in_memory(),
        StorageBackend::File(path) => Store::new(FileStore::open(path.clone()).await?),
    })
}

/// A store that keeps its records in memory and writes them through to a JSON file.
///
/// The file is read once when the store is opened, so it shouldn't be shared between
/// processes.
pub struct FileStore {
    path: PathBuf,
    records: Mutex<Records>,
}

impl FileStore {
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();

        let records = match tokio::fs::read(&path).await {
            Ok(contents) => serde_json::from_slice(&contents)?,
            Err(error) if error.kind() == io::ErrorKind::NotFound => Records::new(),
            Err(error) => return Err(error.into()),
        };

        tracing::debug!("opened cache file {} with {} records", path.display(), records.len());

        Ok(FileStore {
            path,
            records: Mutex::new(records),
        })
    }

    async fn persist(&self, records: &Records) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write to the side & rename so readers never see half a file
        let temporary = self.path.with_extension("tmp");
        tokio::fs::write(&temporary, serde_json::to_vec_pretty(records)?).await?;
        tokio::fs::rename(&temporary, &self.path).await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl StoreInner for FileStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Record>> {
        Ok(self.records.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, record: Record) -> StoreResult<()> {
        let mut records = self.records.lock().await;
        records.insert(key.to_string(), record);
        self.persist(&records).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut records = self.records.lock().await;
        if records.shift_remove(key).is_some() {
            self.persist(&records).await?;
        }
        Ok(())
    }

    async fn clear(&self) -> StoreResult<()> {
        let mut records = self.records.lock().await;
        records.clear();
        self.persist(&records).await
    }

    async fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.records.lock().await.keys().cloned().collect())
    }

    async fn merge(&self, key: &str, record: Record) -> StoreResult<()> {
        let mut records = self.records.lock().await;
        records.entry(key.to_string()).or_default().merge(record);
        self.persist(&records).await
    }
}

#[cfg(test)]
mod tests {
    use quell::{FieldValue, StoreError};
    use serde_json::json;

    use super::*;

    fn record(fields: serde_json::Value) -> Record {
        serde_json::from_value(fields).unwrap()
    }

    #[tokio::test]
    async fn test_records_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache").join("quell.json");

        let store = FileStore::open(&path).await.unwrap();
        store
            .merge("character:1", record(json!({"_id": "1", "name": "Luke"})))
            .await
            .unwrap();
        store
            .merge("character:1", record(json!({"homeworld": {"__ref": "planet:1"}})))
            .await
            .unwrap();
        drop(store);

        let store = FileStore::open(&path).await.unwrap();
        let luke = store.get("character:1").await.unwrap().unwrap();

        assert_eq!(luke.get("name"), Some(&FieldValue::Scalar(json!("Luke"))));
        assert_eq!(luke.get("homeworld"), Some(&FieldValue::reference("planet:1")));
        assert_eq!(store.keys().await.unwrap(), ["character:1"]);
    }

    #[tokio::test]
    async fn test_clear_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quell.json");

        let store = FileStore::open(&path).await.unwrap();
        store.set("character:1", record(json!({"name": "Luke"}))).await.unwrap();
        store.set("character:2", record(json!({"name": "Leia"}))).await.unwrap();

        store.delete("character:1").await.unwrap();
        assert_eq!(store.keys().await.unwrap(), ["character:2"]);

        store.clear().await.unwrap();
        let reopened = FileStore::open(&path).await.unwrap();
        assert!(reopened.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_files_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quell.json");
        std::fs::write(&path, "not json").unwrap();

        let error = FileStore::open(&path).await.err().unwrap();

        assert!(matches!(error, StoreError::Serialization(_)), "{error:?}");
    }

    #[tokio::test]
    async fn test_open_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quell.json");

        let store = open_store(&StorageBackend::File(path.clone())).await.unwrap();
        store.set("planet:1", record(json!({"name": "Tatooine"}))).await.unwrap();
        assert!(path.exists());

        let store = open_store(&StorageBackend::Memory).await.unwrap();
        assert!(store.keys().await.unwrap().is_empty());
    }
}
