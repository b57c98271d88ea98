//! HTTP response building module
//!
//! Builders for the non-200 responses the asset server emits.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{self, HeaderMap, HeaderValue};
use hyper::{Response, StatusCode};

pub type Body = Full<Bytes>;

/// Build an empty response with the given status and headers
pub fn build_empty_response(status: StatusCode, headers: HeaderMap) -> Response<Body> {
    let mut resp = Response::new(Full::new(Bytes::new()));
    *resp.status_mut() = status;
    *resp.headers_mut() = headers;
    resp
}

/// Build 204 No Content response
pub fn build_204_response() -> Response<Body> {
    build_empty_response(StatusCode::NO_CONTENT, HeaderMap::new())
}

/// Build a plain-text error response carrying `message`
pub fn build_error_response(status: StatusCode, message: &str) -> Response<Body> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
        .body(Full::new(Bytes::from(format!("{message}\n"))))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            build_empty_response(status, HeaderMap::new())
        })
}

/// Build 304 Not Modified response from the headers prepared for a 200
///
/// Representation headers are dropped; `Last-Modified` is dropped as well
/// when an `ETag` is present.
pub fn build_304_response(mut headers: HeaderMap) -> Response<Body> {
    headers.remove(header::CONTENT_TYPE);
    headers.remove(header::CONTENT_LENGTH);
    headers.remove(header::CONTENT_ENCODING);
    if headers.contains_key(header::ETAG) {
        headers.remove(header::LAST_MODIFIED);
    }
    build_empty_response(StatusCode::NOT_MODIFIED, headers)
}

/// Build 412 Precondition Failed response, keeping the validators in `headers`
pub fn build_412_response(headers: HeaderMap) -> Response<Body> {
    build_empty_response(StatusCode::PRECONDITION_FAILED, headers)
}

/// Build 416 Range Not Satisfiable response
///
/// Validators and other headers prepared for the 200 are kept; the
/// representation headers are replaced by the plain-text error body.
pub fn build_416_response(mut headers: HeaderMap, size: u64) -> Response<Body> {
    headers.remove(header::CONTENT_TYPE);
    headers.remove(header::CONTENT_LENGTH);
    headers.remove(header::CONTENT_ENCODING);

    let mut resp = build_error_response(
        StatusCode::RANGE_NOT_SATISFIABLE,
        "invalid range: failed to overlap",
    );
    for (name, value) in &headers {
        resp.headers_mut().append(name, value.clone());
    }
    if let Ok(value) = HeaderValue::from_str(&format!("bytes */{size}")) {
        resp.headers_mut().insert(header::CONTENT_RANGE, value);
    }
    resp
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<Body> {
    let mut resp = build_error_response(StatusCode::METHOD_NOT_ALLOWED, "405 Method Not Allowed");
    resp.headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static("GET, HEAD, OPTIONS"));
    resp
}

/// Build OPTIONS response
pub fn build_options_response() -> Response<Body> {
    let mut headers = HeaderMap::new();
    headers.insert(header::ALLOW, HeaderValue::from_static("GET, HEAD, OPTIONS"));
    build_empty_response(StatusCode::NO_CONTENT, headers)
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
