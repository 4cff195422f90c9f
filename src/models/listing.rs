//! A directory view over a key prefix.

use super::object::ObjectRecord;

/// Objects sharing a key prefix, in the order the store returned them.
///
/// Computed per request and never cached as such; only the rendered object
/// entries go through the listing cache.
#[derive(Debug, Clone)]
pub struct DirectoryListing {
    /// Storage prefix, `""` for the root directory.
    pub prefix: String,
    pub records: Vec<ObjectRecord>,
}

impl DirectoryListing {
    pub fn new(prefix: impl Into<String>, records: Vec<ObjectRecord>) -> Self {
        Self {
            prefix: prefix.into(),
            records,
        }
    }
}
