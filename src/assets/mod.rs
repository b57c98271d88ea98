//! Single-page-app asset serving
//!
//! Request flow: `handler` → `resolver` (path to file) → `responder`
//! (file to response). The same flow runs over the compiled bundle and over
//! an external directory; only `source` knows the difference.

pub mod handler;
pub mod resolver;
pub mod responder;
pub mod source;

#[cfg(test)]
mod testing;

pub use handler::{
    new_asset_handler, AssetHandler, AssetService, Handler, SetCacheControl, EMBED_PREFIX,
};
pub use resolver::{clean_path, resolve, ResolveError, ResolvedAsset, DEFAULT_FILE};
pub use responder::{respond, weak_etag};
pub use source::{AssetFile, AssetFs, AssetInfo, AssetSource, SeekableContent};
