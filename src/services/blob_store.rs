//! The blob-store contract consumed by the gateway.
//!
//! Stores own object bytes and metadata durably and provide per-key strong
//! consistency. The gateway only ever talks to them through this trait, so
//! handlers can be driven by `MemoryBlobStore` in tests and `DiskBlobStore`
//! in production.

use crate::models::object::ObjectRecord;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::io;
use thiserror::Error;

/// Streamed object payload.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("file not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("store failure: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable key-value object storage addressed by canonical keys.
///
/// Keys passed in are already validated by the path resolver.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch an object's metadata and a stream over its bytes.
    async fn get(&self, key: &str) -> StoreResult<(ObjectRecord, ByteStream)>;

    /// Store `data` under `key`, replacing any previous object.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StoreResult<ObjectRecord>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// All objects whose key starts with `prefix`, in store-defined order.
    async fn list(&self, prefix: &str) -> StoreResult<Vec<ObjectRecord>>;

    /// Cheap check used by the readiness endpoint.
    async fn check_ready(&self) -> StoreResult<()> {
        Ok(())
    }
}
