//! Shared handler state.

use crate::services::{blob_store::BlobStore, listing_cache::CacheCoordinator};
use std::sync::Arc;

/// Dependencies injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BlobStore>,
    pub cache: CacheCoordinator,
}

impl AppState {
    pub fn new(store: Arc<dyn BlobStore>, cache: CacheCoordinator) -> Self {
        Self { store, cache }
    }
}
