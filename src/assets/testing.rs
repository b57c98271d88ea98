// In-memory asset source for unit tests

use super::source::{AssetFile, AssetFs, AssetInfo, SeekableContent};
use std::collections::HashMap;
use std::future::Future;
use std::io::{self, Cursor};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
enum Entry {
    File {
        data: Vec<u8>,
        stat_fails: bool,
        seekable: bool,
    },
    OpenError(io::ErrorKind),
}

/// Source whose entries and failure modes are set up by the test
#[derive(Debug, Default)]
pub struct MemoryFs {
    entries: HashMap<String, Entry>,
    opened: Mutex<Vec<String>>,
    handles: Arc<AtomicUsize>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entry(mut self, name: &str, entry: Entry) -> Self {
        self.entries.insert(name.to_string(), entry);
        self
    }

    pub fn with_file(self, name: &str, data: &str) -> Self {
        self.with_entry(
            name,
            Entry::File {
                data: data.as_bytes().to_vec(),
                stat_fails: false,
                seekable: true,
            },
        )
    }

    pub fn with_failing_stat(self, name: &str) -> Self {
        self.with_entry(
            name,
            Entry::File {
                data: Vec::new(),
                stat_fails: true,
                seekable: true,
            },
        )
    }

    pub fn with_unseekable_file(self, name: &str, data: &str) -> Self {
        self.with_entry(
            name,
            Entry::File {
                data: data.as_bytes().to_vec(),
                stat_fails: false,
                seekable: false,
            },
        )
    }

    pub fn with_open_error(self, name: &str, kind: io::ErrorKind) -> Self {
        self.with_entry(name, Entry::OpenError(kind))
    }

    /// Names passed to `open`, in call order
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    /// Handles opened and not yet dropped
    pub fn open_handles(&self) -> usize {
        self.handles.load(Ordering::SeqCst)
    }
}

impl AssetFs for MemoryFs {
    type File = MemoryFile;

    fn open(&self, name: &str) -> impl Future<Output = io::Result<MemoryFile>> + Send {
        self.opened.lock().unwrap().push(name.to_string());
        let result = match self.entries.get(name).cloned() {
            Some(Entry::File {
                data,
                stat_fails,
                seekable,
            }) => {
                self.handles.fetch_add(1, Ordering::SeqCst);
                Ok(MemoryFile {
                    name: name.rsplit('/').next().unwrap_or(name).to_string(),
                    cursor: Cursor::new(data),
                    stat_fails,
                    seekable,
                    handles: Arc::clone(&self.handles),
                })
            }
            Some(Entry::OpenError(kind)) => Err(io::Error::new(kind, format!("open {name}"))),
            None => Err(io::Error::new(io::ErrorKind::NotFound, format!("open {name}"))),
        };
        std::future::ready(result)
    }
}

#[derive(Debug)]
pub struct MemoryFile {
    name: String,
    cursor: Cursor<Vec<u8>>,
    stat_fails: bool,
    seekable: bool,
    handles: Arc<AtomicUsize>,
}

impl AssetFile for MemoryFile {
    fn stat(&self) -> impl Future<Output = io::Result<AssetInfo>> + Send {
        let result = if self.stat_fails {
            Err(io::Error::other("stat failed"))
        } else {
            Ok(AssetInfo {
                name: self.name.clone(),
                size: self.cursor.get_ref().len() as u64,
                modified: None,
            })
        };
        std::future::ready(result)
    }

    fn content(&mut self) -> Option<&mut dyn SeekableContent> {
        if self.seekable {
            Some(&mut self.cursor)
        } else {
            None
        }
    }
}

impl Drop for MemoryFile {
    fn drop(&mut self) {
        self.handles.fetch_sub(1, Ordering::SeqCst);
    }
}
