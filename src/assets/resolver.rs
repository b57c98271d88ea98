//! Asset path resolution
//!
//! Maps a request path onto an entry of an `AssetFs`, applying the
//! single-page-app rule: anything that is not a real file is answered with the
//! default document.

use super::source::{AssetFile, AssetFs, AssetInfo};
use crate::logger;
use std::io;
use thiserror::Error;

/// Document served for the root path and for every unmatched path
pub const DEFAULT_FILE: &str = "index.html";

/// Outcome of a successful resolution
#[derive(Debug)]
pub struct ResolvedAsset<F> {
    /// Open handle, released when the value is dropped
    pub file: F,
    pub info: AssetInfo,
    /// Path used for Content-Type inference
    pub path: String,
    /// True when the default document is served in place of the request
    pub is_fallback: bool,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    /// Neither the requested entry nor the default document could be opened
    #[error("{0}")]
    NotFound(#[source] io::Error),
    /// The entry was opened but its metadata could not be read
    #[error("{0}")]
    StatFailure(#[source] io::Error),
}

/// Normalize a request path into a `/`-separated name relative to the root.
///
/// `.` and empty segments are dropped and `..` pops the previous segment; a
/// `..` at the root is discarded, so the result never climbs above the root.
/// The root itself normalizes to the empty string.
pub fn clean_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.trim_start_matches('/').split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{name}", prefix.trim_end_matches('/'))
    }
}

/// Resolve `request_path` below `prefix` in `source`.
///
/// The root path and any path that does not name an existing entry resolve to
/// `prefix/index.html` with `is_fallback` set.
pub async fn resolve<S: AssetFs>(
    source: &S,
    prefix: &str,
    request_path: &str,
) -> Result<ResolvedAsset<S::File>, ResolveError> {
    let default_name = join(prefix, DEFAULT_FILE);
    let name = clean_path(request_path);

    let (file, path, is_fallback) = if name.is_empty() {
        let file = source
            .open(&default_name)
            .await
            .map_err(ResolveError::NotFound)?;
        (file, DEFAULT_FILE.to_string(), true)
    } else {
        match source.open(&join(prefix, &name)).await {
            Ok(file) => (file, name, false),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                logger::log_debug(&format!("No asset at '{name}', serving {DEFAULT_FILE}"));
                let file = source
                    .open(&default_name)
                    .await
                    .map_err(ResolveError::NotFound)?;
                (file, name, true)
            }
            Err(e) => return Err(ResolveError::NotFound(e)),
        }
    };

    let info = file.stat().await.map_err(ResolveError::StatFailure)?;

    Ok(ResolvedAsset {
        file,
        info,
        path,
        is_fallback,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::testing::MemoryFs;

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("/"), "");
        assert_eq!(clean_path(""), "");
        assert_eq!(clean_path("/./"), "");
        assert_eq!(clean_path("/app.js"), "app.js");
        assert_eq!(clean_path("//static///css/main.css"), "static/css/main.css");
        assert_eq!(clean_path("/a/./b/../c"), "a/c");
        assert_eq!(clean_path("/a/b/"), "a/b");
    }

    #[test]
    fn test_clean_path_never_escapes_root() {
        assert_eq!(clean_path("/../../secret"), "secret");
        assert_eq!(clean_path("/static/../../../etc/passwd"), "etc/passwd");
        assert_eq!(clean_path(".."), "");
        assert_eq!(clean_path("/a/../.."), "");
    }

    #[tokio::test]
    async fn test_resolve_existing_file() {
        let fs = MemoryFs::new()
            .with_file("build/index.html", "A")
            .with_file("build/app.js", "B");

        let asset = resolve(&fs, "build", "/app.js").await.unwrap();
        assert_eq!(asset.path, "app.js");
        assert_eq!(asset.info.name, "app.js");
        assert_eq!(asset.info.size, 1);
        assert!(!asset.is_fallback);
    }

    #[tokio::test]
    async fn test_resolve_root_serves_default() {
        let fs = MemoryFs::new()
            .with_file("index.html", "A")
            .with_file("app.js", "B");

        let asset = resolve(&fs, "", "/").await.unwrap();
        assert_eq!(asset.path, DEFAULT_FILE);
        assert_eq!(asset.info.name, "index.html");
        assert!(asset.is_fallback);
    }

    #[tokio::test]
    async fn test_resolve_unknown_path_falls_back() {
        let fs = MemoryFs::new().with_file("build/index.html", "A");

        let asset = resolve(&fs, "build", "/nonexistent/page").await.unwrap();
        assert_eq!(asset.info.name, "index.html");
        assert_eq!(asset.path, "nonexistent/page");
        assert!(asset.is_fallback);
    }

    #[tokio::test]
    async fn test_resolve_traversal_stays_inside_prefix() {
        let fs = MemoryFs::new()
            .with_file("build/index.html", "A")
            .with_file("secret", "S");

        let asset = resolve(&fs, "build", "/../secret").await.unwrap();
        assert_eq!(asset.info.name, "index.html");
        assert!(asset.is_fallback);
        assert_eq!(fs.opened(), vec!["build/secret", "build/index.html"]);
    }

    #[tokio::test]
    async fn test_resolve_empty_source_is_not_found() {
        let fs = MemoryFs::new();
        let err = resolve(&fs, "build", "/anything").await.unwrap_err();
        assert!(matches!(err, ResolveError::NotFound(_)));

        let err = resolve(&fs, "build", "/").await.unwrap_err();
        assert!(matches!(err, ResolveError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_resolve_other_open_errors_skip_fallback() {
        let fs = MemoryFs::new()
            .with_file("index.html", "A")
            .with_open_error("locked.js", io::ErrorKind::PermissionDenied);

        let err = resolve(&fs, "", "/locked.js").await.unwrap_err();
        match err {
            ResolveError::NotFound(e) => assert_eq!(e.kind(), io::ErrorKind::PermissionDenied),
            ResolveError::StatFailure(_) => panic!("Expected NotFound"),
        }
    }

    #[tokio::test]
    async fn test_resolve_stat_failure() {
        let fs = MemoryFs::new()
            .with_file("index.html", "A")
            .with_failing_stat("broken.css");

        let err = resolve(&fs, "", "/broken.css").await.unwrap_err();
        assert!(matches!(err, ResolveError::StatFailure(_)));
        assert_eq!(fs.open_handles(), 0);
    }
}
