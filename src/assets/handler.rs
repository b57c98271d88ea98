//! Asset request handlers
//!
//! `new_asset_handler` binds the resolver and responder to either the
//! compiled bundle or an external directory, behind the `Cache-Control`
//! middleware.

use super::resolver::{resolve, ResolveError};
use super::responder::respond;
use super::source::{AssetFs, AssetSource};
use crate::http::cache::CachePolicy;
use crate::http::response::{build_204_response, build_error_response, Body};
use crate::logger;
use hyper::header::{self, HeaderValue};
use hyper::{Request, Response, StatusCode};
use std::borrow::Cow;
use std::future::Future;

/// Directory inside the compiled bundle that holds the assets
pub const EMBED_PREFIX: &str = "build";

/// Something that answers a request with a response
pub trait Handler: Send + Sync {
    fn handle<B: Sync>(&self, req: &Request<B>) -> impl Future<Output = Response<Body>> + Send;
}

/// Serves the files of one asset source
#[derive(Debug, Clone)]
pub struct AssetHandler<S> {
    source: S,
    prefix: String,
    build_commit: String,
}

impl<S: AssetFs> AssetHandler<S> {
    pub fn new(source: S, prefix: impl Into<String>, build_commit: impl Into<String>) -> Self {
        Self {
            source,
            prefix: prefix.into(),
            build_commit: build_commit.into(),
        }
    }

    pub const fn source(&self) -> &S {
        &self.source
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

/// Percent-decode a request path, keeping it raw if it is not UTF-8
fn decode_path(raw: &str) -> Cow<'_, str> {
    urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw))
}

impl<S: AssetFs> Handler for AssetHandler<S> {
    fn handle<B: Sync>(&self, req: &Request<B>) -> impl Future<Output = Response<Body>> + Send {
        async move {
            let path = decode_path(req.uri().path()).into_owned();
            match resolve(&self.source, &self.prefix, &path).await {
                Ok(asset) => respond(req, asset, &self.build_commit).await,
                Err(ResolveError::NotFound(e)) => {
                    // Without a default document this build carries no UI
                    logger::log_warning(&format!("No asset bundle to serve '{path}': {e}"));
                    build_204_response()
                }
                Err(ResolveError::StatFailure(e)) => {
                    logger::log_error(&format!("Failed to stat asset for '{path}': {e}"));
                    build_error_response(StatusCode::FORBIDDEN, &e.to_string())
                }
            }
        }
    }
}

/// Middleware giving every response a `Cache-Control` header.
///
/// The policy acts as a default that is in place before the inner handler
/// runs: a `Cache-Control` value set by the inner handler replaces it.
#[derive(Debug, Clone)]
pub struct SetCacheControl<H> {
    inner: H,
    value: HeaderValue,
}

impl<H: Handler> SetCacheControl<H> {
    pub fn new(inner: H, policy: CachePolicy) -> Self {
        let value = HeaderValue::from_str(&policy.to_header_value())
            .unwrap_or_else(|_| HeaderValue::from_static("public, max-age=3600"));
        Self { inner, value }
    }

    pub const fn inner(&self) -> &H {
        &self.inner
    }
}

impl<H: Handler> Handler for SetCacheControl<H> {
    fn handle<B: Sync>(&self, req: &Request<B>) -> impl Future<Output = Response<Body>> + Send {
        async move {
            let mut resp = self.inner.handle(req).await;
            resp.headers_mut()
                .entry(header::CACHE_CONTROL)
                .or_insert_with(|| self.value.clone());
            resp
        }
    }
}

/// Handler returned by `new_asset_handler`
pub type AssetService = SetCacheControl<AssetHandler<AssetSource>>;

/// Build the asset handler.
///
/// A non-empty `assets_path` serves files from the root of that directory;
/// otherwise the compiled bundle is served from `EMBED_PREFIX`.
pub fn new_asset_handler(assets_path: Option<&str>, build_commit: &str) -> AssetService {
    let handler = match assets_path.filter(|p| !p.is_empty()) {
        Some(path) => AssetHandler::new(AssetSource::directory(path), "", build_commit),
        None => AssetHandler::new(AssetSource::embedded(), EMBED_PREFIX, build_commit),
    };
    SetCacheControl::new(handler, CachePolicy::default())
}
