//! ETag and `If-None-Match` handling for every response.
//!
//! Handlers that know their payload set a content fingerprint as the ETag
//! themselves. Anything else that succeeds gets a hash of its body bytes.
//! Either way, a client that already holds the current ETag gets an empty
//! 304 instead of the body.

use axum::body::{Body, HttpBody, to_bytes};
use axum::extract::Request;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{debug, error};

use crate::checksum::etag_for_bytes;

/// Bodies larger than this are passed through without an ETag.
pub const MAX_ETAG_BODY_BYTES: usize = 1024 * 1024;

/// Whether `If-None-Match` names `etag`.
fn matches_if_none_match(headers: &HeaderMap, etag: &HeaderValue) -> bool {
    let Some(value) = headers.get(header::IF_NONE_MATCH) else {
        return false;
    };
    let (Ok(value), Ok(etag)) = (value.to_str(), etag.to_str()) else {
        return false;
    };
    value
        .split(',')
        .map(str::trim)
        .any(|candidate| candidate == etag || candidate == "*")
}

fn not_modified(mut parts: axum::http::response::Parts) -> Response {
    parts.status = StatusCode::NOT_MODIFIED;
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.remove(header::CONTENT_TYPE);
    Response::from_parts(parts, Body::empty())
}

/// Middleware adding ETags and answering conditional requests.
pub async fn etag_middleware(request: Request, next: Next) -> Response {
    let request_headers = request.headers().clone();
    let response = next.run(request).await;

    if response.status() != StatusCode::OK {
        return response;
    }

    let (mut parts, body) = response.into_parts();

    if let Some(etag) = parts.headers.get(header::ETAG).cloned() {
        if matches_if_none_match(&request_headers, &etag) {
            debug!(etag = ?etag, "not modified");
            return not_modified(parts);
        }
        return Response::from_parts(parts, body);
    }

    if body.size_hint().lower() > MAX_ETAG_BODY_BYTES as u64 {
        return Response::from_parts(parts, body);
    }

    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(error = %e, "failed to buffer response body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if bytes.len() > MAX_ETAG_BODY_BYTES {
        return Response::from_parts(parts, Body::from(bytes));
    }

    let etag = etag_for_bytes(&bytes);
    let Ok(etag) = HeaderValue::from_str(&etag) else {
        return Response::from_parts(parts, Body::from(bytes));
    };
    parts.headers.insert(header::ETAG, etag.clone());

    if matches_if_none_match(&request_headers, &etag) {
        debug!(etag = ?etag, "not modified");
        return not_modified(parts);
    }

    Response::from_parts(parts, Body::from(bytes))
}
