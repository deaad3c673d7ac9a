//! File upload and download handlers.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use futures::TryStreamExt;
use granary_service::FileUpload;
use granary_storage::StorageError;

/// `PUT /v1/files/{name}` — upload a file.
///
/// The client must declare the exact body length; a request without a
/// parsable `Content-Length` is rejected before any work begins.
pub async fn put_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
    request: Request,
) -> ApiResult<StatusCode> {
    let content_length = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .ok_or_else(|| ApiError::BadRequest("missing or invalid Content-Length".to_string()))?;

    let body = request
        .into_body()
        .into_data_stream()
        .map_err(|e| StorageError::Io(std::io::Error::other(e)));

    state
        .service
        .put_file(FileUpload {
            name,
            content_length,
            body: Box::pin(body),
        })
        .await?;

    Ok(StatusCode::OK)
}

/// `GET /v1/files/{name}` — download a file.
///
/// Streams the reassembled body with `Content-Length` taken from the
/// committed metadata; at most one backend part is open at a time.
pub async fn get_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Response> {
    let download = state.service.get_file(&name).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_LENGTH, download.meta.content_length)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .body(Body::from_stream(download.body))
        .map_err(|e| ApiError::Internal(format!("can't build response: {e}")))
}
