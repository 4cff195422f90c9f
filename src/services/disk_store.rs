//! src/services/disk_store.rs
//!
//! DiskBlobStore — the durable `BlobStore` backed by SQLite for metadata and
//! local disk for object payloads. Payloads are sharded beneath
//! `base_path/{shard}/{shard}/{key}` so no single directory grows unbounded.

use crate::{
    models::object::ObjectRecord,
    services::blob_store::{BlobStore, ByteStream, StoreError, StoreResult},
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::StreamExt;
use sqlx::SqlitePool;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    fs::{self, File},
    io::{AsyncReadExt, AsyncWriteExt},
};
use tokio_util::io::ReaderStream;
use tracing::debug;
use uuid::Uuid;

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Clone)]
pub struct DiskBlobStore {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where object payloads are stored.
    pub base_path: PathBuf,
}

impl DiskBlobStore {
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            base_path: base_path.into(),
        }
    }

    /// Apply the embedded schema. Every statement is idempotent, so this is
    /// safe to run on each start.
    pub async fn migrate(&self) -> StoreResult<()> {
        let statements = SCHEMA
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        tracing::info!("Running {} migration statements...", statements.len());

        for stmt in statements {
            debug!("Executing migration SQL: {}", stmt);
            sqlx::query(stmt).execute(&*self.db).await?;
        }
        Ok(())
    }

    /// Two-level shard identifiers for a key: the first two bytes of
    /// MD5(key) as lowercase hex.
    fn object_shards(key: &str) -> (String, String) {
        let digest = md5::compute(key);
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    /// Payload path for a key. Parent directories may not exist yet.
    fn object_path(&self, key: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(key);
        let mut path = self.base_path.clone();
        path.push(shard_a);
        path.push(shard_b);
        path.push(key);
        path
    }

    async fn fetch_record(&self, key: &str) -> StoreResult<ObjectRecord> {
        sqlx::query_as::<_, ObjectRecord>(
            "SELECT key, size_bytes, content_type, etag, last_modified
             FROM objects WHERE key = ?",
        )
        .bind(key)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => StoreError::NotFound(key.to_string()),
            other => StoreError::Sqlx(other),
        })
    }

    /// Write the payload to a temp file next to its final location, fsync it
    /// and rename it into place.
    async fn write_payload(&self, key: &str, data: &[u8]) -> StoreResult<PathBuf> {
        let file_path = self.object_path(key);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            StoreError::Io(io::Error::new(
                ErrorKind::Other,
                "object path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));

        let written = async {
            let mut file = File::create(&tmp_path).await?;
            file.write_all(data).await?;
            file.flush().await?;
            file.sync_all().await?;
            fs::rename(&tmp_path, &file_path).await
        }
        .await;

        if let Err(err) = written {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }
        Ok(file_path)
    }

    /// Remove empty shard directories up to the base path.
    async fn prune_empty_dirs(&self, start: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(&self.base_path) && current != self.base_path {
            match fs::remove_dir(&current).await {
                Ok(_) => match current.parent() {
                    Some(parent) => current = parent.to_path_buf(),
                    None => break,
                },
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl BlobStore for DiskBlobStore {
    async fn get(&self, key: &str) -> StoreResult<(ObjectRecord, ByteStream)> {
        let mut record = self.fetch_record(key).await?;
        let file = File::open(self.object_path(key)).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                StoreError::NotFound(key.to_string())
            } else {
                StoreError::Io(err)
            }
        })?;
        // The open handle pins the payload; a concurrent put renames a new
        // file in. Report the length of what will actually be streamed.
        let len = file.metadata().await?.len();
        record.size_bytes = i64::try_from(len).unwrap_or(i64::MAX);
        Ok((record, ReaderStream::new(file.take(len)).boxed()))
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StoreResult<ObjectRecord> {
        let file_path = self.write_payload(key, &data).await?;
        let etag = format!("{:x}", md5::compute(&data));

        let upsert = sqlx::query_as::<_, ObjectRecord>(
            r#"
            INSERT INTO objects (key, size_bytes, content_type, etag, last_modified)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                size_bytes = excluded.size_bytes,
                content_type = excluded.content_type,
                etag = excluded.etag,
                last_modified = excluded.last_modified
            RETURNING key, size_bytes, content_type, etag, last_modified
            "#,
        )
        .bind(key)
        .bind(data.len() as i64)
        .bind(content_type)
        .bind(&etag)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await;

        match upsert {
            Ok(record) => Ok(record),
            Err(err) => {
                let _ = fs::remove_file(&file_path).await;
                Err(StoreError::Sqlx(err))
            }
        }
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM objects WHERE key = ?")
            .bind(key)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            debug!("delete of missing key {}", key);
        }

        let file_path = self.object_path(key);
        match fs::remove_file(&file_path).await {
            Ok(_) => debug!("removed physical file {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("file {} already missing", file_path.display());
            }
            Err(err) => return Err(StoreError::Io(err)),
        }

        if let Some(parent) = file_path.parent() {
            self.prune_empty_dirs(parent).await;
        }
        Ok(())
    }

    async fn list(&self, prefix: &str) -> StoreResult<Vec<ObjectRecord>> {
        let records = sqlx::query_as::<_, ObjectRecord>(
            r#"SELECT key, size_bytes, content_type, etag, last_modified
               FROM objects WHERE key LIKE ? ESCAPE '\' ORDER BY key ASC"#,
        )
        .bind(format!("{}%", escape_like(prefix)))
        .fetch_all(&*self.db)
        .await?;
        Ok(records)
    }

    async fn check_ready(&self) -> StoreResult<()> {
        let one = sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await?;
        if one != 1 {
            return Err(StoreError::Backend(format!("unexpected result: {}", one)));
        }

        let tmp_path = self.base_path.join(format!(".readyz-{}", Uuid::new_v4()));
        fs::create_dir_all(&self.base_path).await?;
        fs::write(&tmp_path, b"readyz").await?;
        let bytes = fs::read(&tmp_path).await;
        let _ = fs::remove_file(&tmp_path).await;
        if bytes? != b"readyz" {
            return Err(StoreError::Backend("file content mismatch".into()));
        }
        Ok(())
    }
}

/// Escape `LIKE` wildcards so a prefix only matches literally.
fn escape_like(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
