//! Metadata of a stored object as reported by a blob store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Read-only projection of a stored object.
///
/// Records are produced by a `BlobStore` on `get`, `put` and `list`; the
/// gateway never builds one itself. The payload bytes are not part of the
/// record.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct ObjectRecord {
    /// Canonical object key (no leading slash).
    pub key: String,

    /// Size in bytes.
    pub size_bytes: i64,

    /// Content type (MIME type) recorded at upload time.
    pub content_type: String,

    /// MD5 of the payload, lowercase hex, unquoted.
    pub etag: String,

    /// Timestamp when the object was last written.
    pub last_modified: DateTime<Utc>,
}

impl ObjectRecord {
    /// Final path segment of the key, used as a suggested download name.
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}
