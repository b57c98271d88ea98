//! Asset source module
//!
//! A read-only hierarchy of named files, backed either by the bundle compiled
//! into the binary or by a directory on disk. Both variants are reached through
//! the same `AssetFs` capability so that path resolution never depends on where
//! the bytes live.

use include_dir::{include_dir, Dir};
use std::fmt;
use std::future::Future;
use std::io::{self, Cursor};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tokio::io::{AsyncRead, AsyncSeek};

/// Bundle packaged at build time. Files live under `EMBED_PREFIX`.
static EMBEDDED_ASSETS: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/static");

/// Readable content that supports random access
pub trait SeekableContent: AsyncRead + AsyncSeek + Send + Unpin {}

impl<T: AsyncRead + AsyncSeek + Send + Unpin + ?Sized> SeekableContent for T {}

/// Metadata of an opened asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetInfo {
    /// Base name of the file (no directory part)
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Modification time, `None` for embedded assets
    pub modified: Option<SystemTime>,
}

/// An opened asset. Dropping the value releases the handle.
pub trait AssetFile: Send + Sync {
    /// Read the file's metadata
    fn stat(&self) -> impl Future<Output = io::Result<AssetInfo>> + Send;

    /// Seekable view of the content, `None` if the backing store cannot seek
    fn content(&mut self) -> Option<&mut dyn SeekableContent>;
}

/// Capability to open named entries, `/`-separated and relative to the source root
pub trait AssetFs: Send + Sync {
    type File: AssetFile;

    fn open(&self, name: &str) -> impl Future<Output = io::Result<Self::File>> + Send;
}

/// The two backing stores an asset handler can be bound to
#[derive(Clone)]
pub enum AssetSource {
    /// Bundle compiled into the binary
    Embedded(&'static Dir<'static>),
    /// Directory on disk
    Directory(PathBuf),
}

impl AssetSource {
    /// Source backed by the bundle compiled into this binary
    pub fn embedded() -> Self {
        Self::Embedded(&EMBEDDED_ASSETS)
    }

    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self::Directory(path.into())
    }
}

impl fmt::Debug for AssetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Embedded(dir) => f
                .debug_tuple("Embedded")
                .field(&dir.path())
                .finish(),
            Self::Directory(path) => f.debug_tuple("Directory").field(path).finish(),
        }
    }
}

impl AssetFs for AssetSource {
    type File = SourceFile;

    fn open(&self, name: &str) -> impl Future<Output = io::Result<SourceFile>> + Send {
        let name = name.to_owned();
        async move {
            match self {
                Self::Embedded(dir) => EmbeddedFile::open(dir, &name).map(SourceFile::Embedded),
                Self::Directory(root) => DiskFile::open(root, &name).await.map(SourceFile::Disk),
            }
        }
    }
}

/// File opened from an `AssetSource`
#[derive(Debug)]
pub enum SourceFile {
    Embedded(EmbeddedFile),
    Disk(DiskFile),
}

impl AssetFile for SourceFile {
    fn stat(&self) -> impl Future<Output = io::Result<AssetInfo>> + Send {
        async move {
            match self {
                Self::Embedded(file) => file.stat().await,
                Self::Disk(file) => file.stat().await,
            }
        }
    }

    fn content(&mut self) -> Option<&mut dyn SeekableContent> {
        match self {
            Self::Embedded(file) => file.content(),
            Self::Disk(file) => file.content(),
        }
    }
}

/// In-memory view of a file in the compiled bundle
#[derive(Debug)]
pub struct EmbeddedFile {
    name: String,
    cursor: Cursor<&'static [u8]>,
}

impl EmbeddedFile {
    fn open(dir: &Dir<'static>, name: &str) -> io::Result<Self> {
        // Directories are not readable entries
        let file = dir.get_file(name).ok_or_else(|| not_found(name))?;
        Ok(Self {
            name: base_name(file.path()),
            cursor: Cursor::new(file.contents()),
        })
    }
}

impl AssetFile for EmbeddedFile {
    fn stat(&self) -> impl Future<Output = io::Result<AssetInfo>> + Send {
        std::future::ready(Ok(AssetInfo {
            name: self.name.clone(),
            size: self.cursor.get_ref().len() as u64,
            modified: None,
        }))
    }

    fn content(&mut self) -> Option<&mut dyn SeekableContent> {
        Some(&mut self.cursor)
    }
}

/// Regular file opened below an asset directory
#[derive(Debug)]
pub struct DiskFile {
    name: String,
    file: tokio::fs::File,
}

impl DiskFile {
    async fn open(root: &Path, name: &str) -> io::Result<Self> {
        let relative = Path::new(name);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("open {name}: invalid argument"),
            ));
        }

        // A path below a regular file is absent, as in the compiled bundle
        let file = match tokio::fs::File::open(root.join(relative)).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotADirectory => return Err(not_found(name)),
            Err(e) => return Err(e),
        };
        if file.metadata().await.is_ok_and(|m| m.is_dir()) {
            return Err(not_found(name));
        }

        Ok(Self {
            name: base_name(relative),
            file,
        })
    }
}

impl AssetFile for DiskFile {
    fn stat(&self) -> impl Future<Output = io::Result<AssetInfo>> + Send {
        async move {
            let meta = self.file.metadata().await?;
            Ok(AssetInfo {
                name: self.name.clone(),
                size: meta.len(),
                modified: meta.modified().ok(),
            })
        }
    }

    fn content(&mut self) -> Option<&mut dyn SeekableContent> {
        Some(&mut self.file)
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn not_found(name: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("open {name}: file does not exist"),
    )
}
