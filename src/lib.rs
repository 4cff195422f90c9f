//! HTTP gateway exposing file-storage semantics over a blob store.
//!
//! Request paths are canonicalized by `services::path_resolver`, objects live
//! behind the `services::blob_store::BlobStore` trait, and directory listings
//! are cached through `services::listing_cache::CacheCoordinator`, which
//! invalidates a directory's entry whenever an object under it changes.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;
use config::AppConfig;
use state::AppState;

/// Router with state attached, ready to serve.
pub fn app(cfg: &AppConfig, state: AppState) -> Router {
    routes::routes::routes(cfg).with_state(state)
}
