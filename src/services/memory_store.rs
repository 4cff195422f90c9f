//! In-process `BlobStore` used by tests and `--backend memory`.

use crate::{
    models::object::ObjectRecord,
    services::blob_store::{BlobStore, ByteStream, StoreError, StoreResult},
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::{StreamExt, stream};
use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicUsize, Ordering},
};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryBlobStore {
    objects: RwLock<BTreeMap<String, (ObjectRecord, Bytes)>>,
    operations: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store operations served so far.
    pub fn operation_count(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    fn record_operation(&self) {
        self.operations.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> StoreResult<(ObjectRecord, ByteStream)> {
        self.record_operation();
        let objects = self.objects.read().await;
        let (record, data) = objects
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        Ok((record, stream::once(async move { Ok::<_, std::io::Error>(data) }).boxed()))
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StoreResult<ObjectRecord> {
        self.record_operation();
        let record = ObjectRecord {
            key: key.to_string(),
            size_bytes: data.len() as i64,
            content_type: content_type.to_string(),
            etag: format!("{:x}", md5::compute(&data)),
            last_modified: Utc::now(),
        };
        self.objects
            .write()
            .await
            .insert(key.to_string(), (record.clone(), data));
        Ok(record)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.record_operation();
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> StoreResult<Vec<ObjectRecord>> {
        self.record_operation();
        let objects = self.objects.read().await;
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(_, (record, _))| record.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delete_missing_key_is_ok() {
        let store = MemoryBlobStore::new();
        store.delete("nope").await.unwrap();
        assert_eq!(store.operation_count(), 1);
    }

    #[tokio::test]
    async fn list_by_prefix() {
        let store = MemoryBlobStore::new();
        for key in ["a/1", "a/2", "ab", "b/1"] {
            store.put(key, Bytes::from_static(b"x"), "text/plain").await.unwrap();
        }
        let keys: Vec<String> = store
            .list("a/")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.key)
            .collect();
        assert_eq!(keys, vec!["a/1", "a/2"]);
        assert_eq!(store.list("").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn get_missing_key_is_not_found() {
        let store = MemoryBlobStore::new();
        assert!(matches!(store.get("x").await, Err(StoreError::NotFound(k)) if k == "x"));
    }
}
