//! HTTP protocol layer module
//!
//! Protocol helpers used by the asset core, independent of where assets live.

pub mod cache;
pub mod date;
pub mod mime;
pub mod range;
pub mod response;
pub mod serve;

pub use serve::serve_content;
