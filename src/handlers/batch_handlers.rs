//! Multi-file upload and on-demand cache flush.

use crate::{
    errors::AppError,
    models::batch::BatchItemResult,
    services::{
        content_type::content_type_for,
        path_resolver::{parent_directory, resolve_name},
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{Multipart, State, multipart::Field},
    http::StatusCode,
    response::IntoResponse,
};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// `POST {upload_path}` — store every file part of a multipart body.
///
/// Each part is validated and stored on its own; a bad name or a store
/// failure marks only that part as failed. Parts without a file name are
/// skipped. If the body breaks off after some parts were handled, those
/// outcomes are kept, a failed item describes the break, and the touched
/// directories are still invalidated. A body that is unreadable from the
/// first part on is a 400.
pub async fn upload_multiple(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Vec<BatchItemResult>>, AppError> {
    let mut results = Vec::new();
    let mut touched = BTreeSet::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                let message = format!("malformed multipart body: {}", err);
                if results.is_empty() {
                    return Err(AppError::bad_request(message));
                }
                warn!(error = %err, handled = results.len(), "multipart body ended early");
                results.push(BatchItemResult::failed("", message));
                break;
            }
        };
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };

        match store_part(&state, &name, field).await {
            Ok((key, content_type)) => {
                touched.insert(parent_directory(&key));
                results.push(BatchItemResult::success(key, content_type));
            }
            Err(err) => {
                warn!(%name, error = %err, "batch item failed");
                results.push(BatchItemResult::failed(name, err));
            }
        }
    }

    for directory in &touched {
        state.cache.invalidate(directory);
    }

    let stored = results.iter().filter(|r| r.is_success()).count();
    info!(stored, failed = results.len() - stored, "batch upload finished");
    Ok(Json(results))
}

async fn store_part(
    state: &AppState,
    name: &str,
    field: Field<'_>,
) -> Result<(String, &'static str), AppError> {
    let key = resolve_name(name)?;
    let content_type = content_type_for(key.as_str());
    let data = field
        .bytes()
        .await
        .map_err(|err| AppError::bad_request(format!("failed to read part: {}", err)))?;

    state
        .store
        .put(key.as_str(), data, content_type)
        .await
        .map_err(|err| AppError::from_store("failed to upload file", err))?;
    Ok((key.to_string(), content_type))
}

/// `POST {flush_path}` — drop the cached root listing.
pub async fn flush_cache(State(state): State<AppState>) -> impl IntoResponse {
    state.cache.invalidate("/");
    info!("root listing cache flush scheduled");
    (StatusCode::OK, "cache deleted successfully")
}
