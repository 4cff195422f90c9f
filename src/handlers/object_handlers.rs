//! HTTP handlers for single-object operations and directory listings.
//! Object bodies are streamed out of the store; every mutation schedules a
//! background invalidation of the parent directory's cached listing.

use crate::{
    errors::AppError,
    models::{listing::DirectoryListing, object::ObjectRecord},
    services::{
        content_type::content_type_for,
        listing_cache::CachedListing,
        listing_renderer::{LISTING_CONTENT_TYPE, http_date, render_entries, render_multistatus},
        path_resolver::{resolve_key, resolve_prefix},
    },
    state::AppState,
};
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use tracing::{debug, info};

/// `GET /` — listing of the root directory.
pub async fn list_root(State(state): State<AppState>, uri: Uri) -> Result<Response, AppError> {
    list_directory(&state, uri.path(), StatusCode::OK).await
}

/// `GET /{*path}` — a listing when the path ends with `/`, otherwise the
/// object's bytes.
pub async fn get_path(State(state): State<AppState>, uri: Uri) -> Result<Response, AppError> {
    let raw = uri.path();
    if raw.ends_with('/') {
        list_directory(&state, raw, StatusCode::OK).await
    } else {
        get_object(&state, raw).await
    }
}

/// Methods without a dedicated route. `PROPFIND` lists the path as a
/// directory; anything else is rejected.
pub async fn other_method(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
) -> Result<Response, AppError> {
    if method.as_str() == "PROPFIND" {
        return list_directory(&state, uri.path(), StatusCode::MULTI_STATUS).await;
    }
    Err(AppError::new(
        StatusCode::METHOD_NOT_ALLOWED,
        format!("method {} not allowed", method),
    ))
}

/// `PUT /{*path}` — store the body verbatim under the resolved key.
pub async fn put_object(
    State(state): State<AppState>,
    uri: Uri,
    body: Bytes,
) -> Result<Response, AppError> {
    let key = resolve_key(uri.path())?;
    let content_type = content_type_for(key.as_str());

    let record = state
        .store
        .put(key.as_str(), body, content_type)
        .await
        .map_err(|err| AppError::from_store("failed to upload file", err))?;
    state.cache.invalidate(&key.parent_directory());
    info!(key = %key, size = record.size_bytes, content_type, "stored object");

    let mut response = (StatusCode::OK, "File uploaded successfully").into_response();
    if let Ok(value) = HeaderValue::from_str(&format!("\"{}\"", record.etag)) {
        response.headers_mut().insert(header::ETAG, value);
    }
    Ok(response)
}

/// `DELETE /{*path}` — idempotent delete.
pub async fn delete_object(
    State(state): State<AppState>,
    uri: Uri,
) -> Result<Response, AppError> {
    let key = resolve_key(uri.path())?;

    state
        .store
        .delete(key.as_str())
        .await
        .map_err(|err| AppError::from_store("failed to delete file", err))?;
    state.cache.invalidate(&key.parent_directory());
    info!(key = %key, "deleted object");

    Ok((StatusCode::OK, "File deleted successfully").into_response())
}

async fn get_object(state: &AppState, raw: &str) -> Result<Response, AppError> {
    let key = resolve_key(raw)?;
    let (meta, stream) = state
        .store
        .get(key.as_str())
        .await
        .map_err(|err| AppError::from_store("failed to fetch file", err))?;

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = StatusCode::OK;
    set_object_headers(response.headers_mut(), &meta);
    Ok(response)
}

/// Render (or serve from cache) the listing for the directory at `raw`.
///
/// The cache holds only the object entries; the collection entry is rendered
/// for every response so its href is always this request's path.
async fn list_directory(
    state: &AppState,
    raw: &str,
    status: StatusCode,
) -> Result<Response, AppError> {
    let prefix = resolve_prefix(raw)?;

    if let Some(hit) = state.cache.lookup(&prefix).await {
        debug!(%prefix, "listing served from cache");
        return Ok(listing_response(status, raw, &prefix, hit));
    }

    let generation = state.cache.generation(&prefix);
    let records = state
        .store
        .list(&prefix)
        .await
        .map_err(|err| AppError::from_store("failed to list directory", err))?;
    let listing = DirectoryListing::new(prefix, records);
    debug!(prefix = %listing.prefix, entries = listing.records.len(), "rendering listing");

    let rendered = CachedListing {
        entries: render_entries(&listing.records),
        generation,
        content_type: LISTING_CONTENT_TYPE.to_string(),
    };
    state.cache.store(&listing.prefix, rendered.clone()).await;
    Ok(listing_response(status, raw, &listing.prefix, rendered))
}

fn listing_response(
    status: StatusCode,
    raw: &str,
    prefix: &str,
    listing: CachedListing,
) -> Response {
    let body = render_multistatus(raw, prefix, &listing.entries);
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&listing.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static(LISTING_CONTENT_TYPE)),
    );
    response
}

fn set_object_headers(headers: &mut HeaderMap, meta: &ObjectRecord) {
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&meta.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );

    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(meta.size_bytes.max(0)));

    if let Ok(value) = HeaderValue::from_str(&format!("\"{}\"", meta.etag)) {
        headers.insert(header::ETAG, value);
    }

    if let Ok(value) = HeaderValue::from_str(&http_date(&meta.last_modified)) {
        headers.insert(header::LAST_MODIFIED, value);
    }

    if let Ok(value) = HeaderValue::from_str(&content_disposition(meta.file_name())) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
}

/// `inline` disposition suggesting `name`; non-ASCII names use the RFC 5987
/// `filename*` form.
fn content_disposition(name: &str) -> String {
    if name.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
        let quoted = name.replace('\\', "\\\\").replace('"', "\\\"");
        format!("inline; filename=\"{}\"", quoted)
    } else {
        format!("inline; filename*=UTF-8''{}", urlencoding::encode(name))
    }
}
