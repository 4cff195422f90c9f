//! Core gateway services: path canonicalization, blob stores, the listing
//! cache and listing rendering.

pub mod blob_store;
pub mod content_type;
pub mod disk_store;
pub mod listing_cache;
pub mod listing_renderer;
pub mod memory_store;
pub mod path_resolver;
