//! Caching responder
//!
//! Turns a resolved asset into a response: attaches the weak validator,
//! forces `text/html` for the default document and hands the content to
//! `serve_content`.

use super::resolver::ResolvedAsset;
use super::source::AssetFile;
use crate::http::response::{build_error_response, Body};
use crate::http::serve::serve_content;
use crate::logger;
use hyper::header::{self, HeaderMap, HeaderValue};
use hyper::{Request, Response, StatusCode};
use std::borrow::Cow;

/// Weak entity-tag derived from the asset name, its size and the build commit.
///
/// Assets only change between releases or when a different asset directory
/// is configured, so collisions are unlikely enough for a weak validator.
///
/// Parts holding characters not allowed inside an entity-tag are
/// percent-encoded, so the result is always a valid header value.
pub fn weak_etag(name: &str, size: u64, build_commit: &str) -> String {
    format!(
        "W/\"{}-{size}-{}\"",
        etag_part(name),
        etag_part(build_commit)
    )
}

fn etag_part(part: &str) -> Cow<'_, str> {
    if part.bytes().all(|b| (0x21..=0x7e).contains(&b) && b != b'"') {
        Cow::Borrowed(part)
    } else {
        urlencoding::encode(part)
    }
}

/// Respond with `asset`. The asset's handle is released when this returns.
pub async fn respond<B, F: AssetFile>(
    req: &Request<B>,
    asset: ResolvedAsset<F>,
    build_commit: &str,
) -> Response<Body> {
    let ResolvedAsset {
        mut file,
        info,
        path,
        is_fallback,
    } = asset;

    let mut headers = HeaderMap::new();
    if is_fallback {
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));
    }

    let etag = weak_etag(&info.name, info.size, build_commit);
    match HeaderValue::from_str(&etag) {
        Ok(value) => {
            headers.insert(header::ETAG, value);
        }
        Err(_) => logger::log_warning(&format!("Cannot use {etag} as an ETag header")),
    }

    let Some(content) = file.content() else {
        logger::log_error(&format!("Asset '{}' does not support seeking", info.name));
        return build_error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "500 Internal Server Error",
        );
    };

    serve_content(req, headers, &path, info.modified, content).await
}
