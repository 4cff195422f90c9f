//! Defines routes for the file gateway.
//!
//! ## Structure
//! - **Directory listings**
//!   - `GET      /` and `GET /{dir}/` — multistatus listing
//!   - `PROPFIND /{*path}` — the same listing with a 207 status
//!
//! - **Object-level endpoints**
//!   - `GET    /{*key}` — download object
//!   - `PUT    /{*key}` — upload object
//!   - `DELETE /{*key}` — delete object
//!
//! - **Gateway endpoints** (paths configurable)
//!   - `POST /upload`     — multipart batch upload
//!   - `POST /dump-cache` — drop the cached root listing
//!   - `GET  /healthz`, `GET /readyz`
//!
//! Handlers read the raw request URI rather than the decoded wildcard so
//! that path validation sees exactly what the client sent.

use crate::{
    config::AppConfig,
    handlers::{
        batch_handlers::{flush_cache, upload_multiple},
        health_handlers::{healthz, readyz},
        object_handlers::{delete_object, get_path, list_root, other_method, put_object},
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

/// Build the router carrying `AppState` to all handlers.
pub fn routes(cfg: &AppConfig) -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // gateway endpoints
        .route(&cfg.upload_path, post(upload_multiple))
        .route(&cfg.flush_path, post(flush_cache))
        // listings and objects
        .route("/", get(list_root).fallback(other_method))
        .route(
            "/{*path}",
            get(get_path)
                .put(put_object)
                .delete(delete_object)
                .fallback(other_method),
        )
        .layer(DefaultBodyLimit::max(cfg.max_body_bytes))
        .layer(build_cors_layer(cfg.cors_origins.as_deref()))
        .layer(TraceLayer::new_for_http())
}

/// CORS policy: any origin unless a comma-separated list is configured.
fn build_cors_layer(cors_origins: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    let origins = cors_origins
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin, "invalid cors origin");
                None
            }
        })
        .collect::<Vec<_>>();

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}
