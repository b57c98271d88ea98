//! Static asset serving for a single-page web application.
//!
//! Resolves request paths against either the bundle compiled into the binary
//! or an external directory, falls back to `index.html` for client-side
//! routes, and attaches `ETag`, `Cache-Control`, `Content-Type` and
//! `Last-Modified` headers.

pub mod assets;
pub mod config;
pub mod http;
pub mod logger;
pub mod server;

pub use assets::{new_asset_handler, AssetService, Handler};
