//! Direct streaming with HTTP range requests.
//!
//! Serves inventory files directly with support for a single byte range.

use std::io::SeekFrom;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use super::inventory::{FileEntry, Inventory};
use super::range::ByteRange;

/// Read size used when copying file data to the socket.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Serve an inventory file with range request support.
///
/// Installed as the router fallback so that lookup is an exact match on the
/// request path against the inventory.
pub async fn serve_file(
    State(inventory): State<Arc<Inventory>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    if method != Method::GET && method != Method::HEAD {
        return Ok((
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, HeaderValue::from_static("GET, HEAD"))],
        )
            .into_response());
    }

    // Parse range header if present. Malformed values mean "whole file".
    let range = headers
        .get(header::RANGE)
        .and_then(|h| h.to_str().ok())
        .and_then(ByteRange::parse)
        .filter(|r| !r.is_full());

    let Some(entry) = inventory.resolve(uri.path()) else {
        return Ok((StatusCode::NOT_FOUND, "File not found").into_response());
    };

    let file_size = entry.size;

    let (status, first, last) = match range {
        None => (StatusCode::OK, 0, file_size.checked_sub(1)),
        Some(range) => match range.resolve(file_size) {
            Ok((first, last)) => (StatusCode::PARTIAL_CONTENT, first, Some(last)),
            Err(_) => {
                return Response::builder()
                    .status(StatusCode::RANGE_NOT_SATISFIABLE)
                    .header(header::CONTENT_TYPE, entry.content_type.as_str())
                    .header(header::CONTENT_RANGE, format!("bytes */{}", file_size))
                    .header(header::ACCEPT_RANGES, "bytes")
                    .body(Body::empty())
                    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR);
            }
        },
    };

    // `last` is only absent for a full response of an empty file.
    let length = last.map_or(0, |last| last - first + 1);

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, entry.content_type.as_str())
        .header(header::CONTENT_LENGTH, length.to_string())
        .header(header::ACCEPT_RANGES, "bytes");

    if let (StatusCode::PARTIAL_CONTENT, Some(last)) = (status, last) {
        builder = builder.header(
            header::CONTENT_RANGE,
            format!("bytes {}-{}/{}", first, last, file_size),
        );
    }

    let body = if method == Method::HEAD || length == 0 {
        Body::empty()
    } else {
        open_span(entry, first, length).await?
    };

    builder
        .body(body)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Open the file and produce a body carrying at most `length` bytes starting
/// at `first`.
///
/// A short read ends the body early without an error; the file may shrink
/// while it is being served.
async fn open_span(entry: &FileEntry, first: u64, length: u64) -> Result<Body, StatusCode> {
    let mut file = File::open(&entry.local_path).await.map_err(|e| {
        tracing::warn!(
            path = %entry.local_path.display(),
            error = %e,
            "Failed to open served file"
        );
        StatusCode::NOT_FOUND
    })?;

    if first > 0 {
        file.seek(SeekFrom::Start(first))
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    }

    let stream = ReaderStream::with_capacity(file.take(length), CHUNK_SIZE);
    Ok(Body::from_stream(stream))
}
