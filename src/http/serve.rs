//! Content serving module
//!
//! Writes a seekable representation as a response, handling conditional
//! requests, byte ranges, HEAD, `Last-Modified` and Content-Type inference.

use super::cache;
use super::date::{format_http_date, parse_http_date, unix_seconds};
use super::mime::content_type_for;
use super::range::{parse_range_header, RangeParseResult};
use super::response::{
    build_304_response, build_412_response, build_416_response, build_error_response, Body,
};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{self, HeaderMap, HeaderName, HeaderValue};
use hyper::{Method, Request, Response, StatusCode};
use std::io::{self, SeekFrom};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

/// Outcome of evaluating the request's preconditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Precondition {
    Proceed,
    NotModified,
    Failed,
}

fn header_str(headers: &HeaderMap, name: HeaderName) -> Option<&str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

fn is_get_or_head(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

/// `If-Unmodified-Since`: `None` when it does not apply
fn unmodified_since(headers: &HeaderMap, modified: Option<SystemTime>) -> Option<bool> {
    let modified = modified?;
    let since = parse_http_date(header_str(headers, header::IF_UNMODIFIED_SINCE)?)?;
    Some(unix_seconds(modified) <= since)
}

/// `If-Modified-Since`: true when the client copy is still current
fn not_modified_since(headers: &HeaderMap, modified: Option<SystemTime>) -> bool {
    let Some(modified) = modified else {
        return false;
    };
    header_str(headers, header::IF_MODIFIED_SINCE)
        .and_then(parse_http_date)
        .is_some_and(|since| unix_seconds(modified) <= since)
}

/// Evaluate conditional headers in RFC 9110 section 13.2.2 order
fn check_preconditions<B>(
    req: &Request<B>,
    etag: Option<&str>,
    modified: Option<SystemTime>,
) -> Precondition {
    let headers = req.headers();

    let matched = match header_str(headers, header::IF_MATCH) {
        Some(value) => Some(cache::if_match(value, etag)),
        None => unmodified_since(headers, modified),
    };
    if matched == Some(false) {
        return Precondition::Failed;
    }

    match header_str(headers, header::IF_NONE_MATCH) {
        Some(value) if cache::if_none_match(value, etag) => {
            if is_get_or_head(req.method()) {
                Precondition::NotModified
            } else {
                Precondition::Failed
            }
        }
        Some(_) => Precondition::Proceed,
        None if is_get_or_head(req.method()) && not_modified_since(headers, modified) => {
            Precondition::NotModified
        }
        None => Precondition::Proceed,
    }
}

/// `If-Range`: whether a `Range` header may be honoured
fn range_allowed<B>(req: &Request<B>, etag: Option<&str>, modified: Option<SystemTime>) -> bool {
    if !is_get_or_head(req.method()) {
        return true;
    }
    let Some(value) = header_str(req.headers(), header::IF_RANGE) else {
        return true;
    };

    if value.starts_with('"') || value.starts_with("W/") {
        return etag.is_some_and(|etag| cache::etag_strong_match(value, etag));
    }
    match (modified, parse_http_date(value)) {
        (Some(modified), Some(date)) => unix_seconds(modified) == date,
        _ => false,
    }
}

async fn read_span<R>(content: &mut R, start: u64, len: u64) -> io::Result<Bytes>
where
    R: AsyncRead + AsyncSeek + Unpin + ?Sized,
{
    content.seek(SeekFrom::Start(start)).await?;
    let mut buf = Vec::with_capacity(usize::try_from(len).unwrap_or(0));
    (&mut *content).take(len).read_to_end(&mut buf).await?;
    Ok(Bytes::from(buf))
}

fn internal_error(context: &str, err: &io::Error) -> Response<Body> {
    logger::log_error(&format!("{context}: {err}"));
    build_error_response(StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error")
}

/// Serve `content` as the representation of `name`.
///
/// Headers already in `headers` are kept: a preset Content-Type suppresses
/// inference from `name`, and a preset `ETag` takes part in conditional
/// request evaluation. `modified` of `None` (or the Unix epoch) means no
/// `Last-Modified` header and no date-based validation.
pub async fn serve_content<B, R>(
    req: &Request<B>,
    mut headers: HeaderMap,
    name: &str,
    modified: Option<SystemTime>,
    content: &mut R,
) -> Response<Body>
where
    R: AsyncRead + AsyncSeek + Unpin + ?Sized,
{
    let size = match content.seek(SeekFrom::End(0)).await {
        Ok(size) => size,
        Err(e) => return internal_error("Failed to seek content", &e),
    };

    let modified = modified.filter(|t| *t != UNIX_EPOCH);
    if let Some(time) = modified {
        if let Ok(value) = HeaderValue::from_str(&format_http_date(time)) {
            headers.insert(header::LAST_MODIFIED, value);
        }
    }

    let etag = headers
        .get(header::ETAG)
        .and_then(|v| v.to_str().ok())
        .map(ToOwned::to_owned);

    match check_preconditions(req, etag.as_deref(), modified) {
        Precondition::Proceed => {}
        Precondition::NotModified => return build_304_response(headers),
        Precondition::Failed => return build_412_response(headers),
    }

    if !headers.contains_key(header::CONTENT_TYPE) {
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(content_type_for(name)),
        );
    }
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));

    let range = header_str(req.headers(), header::RANGE)
        .filter(|_| range_allowed(req, etag.as_deref(), modified))
        .map_or(RangeParseResult::None, |value| parse_range_header(value, size));

    let (status, start, len) = match range {
        RangeParseResult::Valid(range) => {
            if let Ok(value) = HeaderValue::from_str(&range.content_range(size)) {
                headers.insert(header::CONTENT_RANGE, value);
            }
            (StatusCode::PARTIAL_CONTENT, range.start, range.len())
        }
        RangeParseResult::NotSatisfiable => return build_416_response(headers, size),
        RangeParseResult::None => (StatusCode::OK, 0, size),
    };
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));

    let body = if *req.method() == Method::HEAD {
        Bytes::new()
    } else {
        match read_span(content, start, len).await {
            Ok(body) => body,
            Err(e) => return internal_error("Failed to read content", &e),
        }
    };

    let mut resp = Response::new(Full::new(body));
    *resp.status_mut() = status;
    *resp.headers_mut() = headers;
    resp
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use std::io::Cursor;
    use std::time::Duration;

    const MODIFIED_SECS: u64 = 784_111_777;
    const MODIFIED_DATE: &str = "Sun, 06 Nov 1994 08:49:37 GMT";

    fn modified() -> Option<SystemTime> {
        Some(UNIX_EPOCH + Duration::from_secs(MODIFIED_SECS))
    }

    fn get(headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().uri("/x");
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(()).unwrap()
    }

    fn etag_headers(etag: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ETAG, HeaderValue::from_static(etag));
        headers
    }

    async fn serve(req: &Request<()>, headers: HeaderMap, modified: Option<SystemTime>) -> Response<Body> {
        let mut content = Cursor::new(b"0123456789".to_vec());
        serve_content(req, headers, "notes.txt", modified, &mut content).await
    }

    async fn body_of(resp: Response<Body>) -> Bytes {
        resp.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_full_content() {
        let resp = serve(&get(&[]), HeaderMap::new(), modified()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(resp.headers()[header::CONTENT_LENGTH], "10");
        assert_eq!(resp.headers()[header::ACCEPT_RANGES], "bytes");
        assert_eq!(resp.headers()[header::LAST_MODIFIED], MODIFIED_DATE);
        assert_eq!(&body_of(resp).await[..], b"0123456789");
    }

    #[tokio::test]
    async fn test_preset_content_type_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));
        let resp = serve(&get(&[]), headers, None).await;
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/html");
    }

    #[tokio::test]
    async fn test_no_last_modified_without_time() {
        let resp = serve(&get(&[]), HeaderMap::new(), None).await;
        assert!(resp.headers().get(header::LAST_MODIFIED).is_none());

        let resp = serve(&get(&[]), HeaderMap::new(), Some(UNIX_EPOCH)).await;
        assert!(resp.headers().get(header::LAST_MODIFIED).is_none());
    }

    #[tokio::test]
    async fn test_if_none_match_gives_304() {
        let req = get(&[("if-none-match", "W/\"notes\"")]);
        let resp = serve(&req, etag_headers("W/\"notes\""), modified()).await;
        assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(resp.headers()[header::ETAG], "W/\"notes\"");
        assert!(resp.headers().get(header::LAST_MODIFIED).is_none());
        assert!(body_of(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_if_none_match_mismatch_ignores_dates() {
        let req = get(&[
            ("if-none-match", "W/\"old\""),
            ("if-modified-since", MODIFIED_DATE),
        ]);
        let resp = serve(&req, etag_headers("W/\"notes\""), modified()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_if_modified_since() {
        let req = get(&[("if-modified-since", MODIFIED_DATE)]);
        let resp = serve(&req, HeaderMap::new(), modified()).await;
        assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);

        let req = get(&[("if-modified-since", "Sat, 05 Nov 1994 08:49:37 GMT")]);
        let resp = serve(&req, HeaderMap::new(), modified()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        // No modification time, nothing to compare against
        let req = get(&[("if-modified-since", MODIFIED_DATE)]);
        let resp = serve(&req, HeaderMap::new(), None).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_if_match_with_weak_etag_fails() {
        let req = get(&[("if-match", "W/\"notes\"")]);
        let resp = serve(&req, etag_headers("W/\"notes\""), None).await;
        assert_eq!(resp.status(), StatusCode::PRECONDITION_FAILED);

        let req = get(&[("if-match", "*")]);
        let resp = serve(&req, etag_headers("W/\"notes\""), None).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_failed_preconditions_keep_validators() {
        let req = get(&[("if-match", "\"other\"")]);
        let resp = serve(&req, etag_headers("W/\"notes\""), modified()).await;
        assert_eq!(resp.status(), StatusCode::PRECONDITION_FAILED);
        assert_eq!(resp.headers()[header::ETAG], "W/\"notes\"");
        assert_eq!(resp.headers()[header::LAST_MODIFIED], MODIFIED_DATE);
        assert!(body_of(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_unsatisfiable_range_keeps_validators() {
        let req = get(&[("range", "bytes=9999-")]);
        let resp = serve(&req, etag_headers("W/\"notes\""), modified()).await;
        assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(resp.headers()[header::ETAG], "W/\"notes\"");
        assert_eq!(resp.headers()[header::LAST_MODIFIED], MODIFIED_DATE);
        assert_eq!(resp.headers()[header::CONTENT_RANGE], "bytes */10");
    }

    #[tokio::test]
    async fn test_if_unmodified_since() {
        let req = get(&[("if-unmodified-since", "Sat, 05 Nov 1994 08:49:37 GMT")]);
        let resp = serve(&req, HeaderMap::new(), modified()).await;
        assert_eq!(resp.status(), StatusCode::PRECONDITION_FAILED);
    }

    #[tokio::test]
    async fn test_range() {
        let req = get(&[("range", "bytes=2-5")]);
        let resp = serve(&req, HeaderMap::new(), None).await;
        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(resp.headers()[header::CONTENT_RANGE], "bytes 2-5/10");
        assert_eq!(resp.headers()[header::CONTENT_LENGTH], "4");
        assert_eq!(&body_of(resp).await[..], b"2345");
    }

    #[tokio::test]
    async fn test_range_not_satisfiable() {
        let req = get(&[("range", "bytes=20-")]);
        let resp = serve(&req, HeaderMap::new(), None).await;
        assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(resp.headers()[header::CONTENT_RANGE], "bytes */10");
    }

    #[tokio::test]
    async fn test_if_range_with_weak_etag_serves_full() {
        let req = get(&[("range", "bytes=0-1"), ("if-range", "W/\"notes\"")]);
        let resp = serve(&req, etag_headers("W/\"notes\""), None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(&body_of(resp).await[..], b"0123456789");
    }

    #[tokio::test]
    async fn test_if_range_with_matching_date() {
        let req = get(&[("range", "bytes=-3"), ("if-range", MODIFIED_DATE)]);
        let resp = serve(&req, HeaderMap::new(), modified()).await;
        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(&body_of(resp).await[..], b"789");
    }

    #[tokio::test]
    async fn test_head_has_length_but_no_body() {
        let req = Request::builder()
            .method(Method::HEAD)
            .uri("/x")
            .body(())
            .unwrap();
        let resp = serve(&req, HeaderMap::new(), None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_LENGTH], "10");
        assert!(body_of(resp).await.is_empty());
    }
}
