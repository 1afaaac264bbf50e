//! Template and include sources supplied by the host.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Error reading a source's text.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("source text is unavailable")]
    Missing,

    #[error("file not found")]
    NotFound,

    #[error("permission denied")]
    PermissionDenied,

    #[error("io error: {0}")]
    Io(#[source] io::Error),
}

impl From<io::Error> for ReadError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => ReadError::NotFound,
            io::ErrorKind::PermissionDenied => ReadError::PermissionDenied,
            _ => ReadError::Io(err),
        }
    }
}

/// A file whose text can be read on demand.
///
/// The path identifies the file: two sources with the same path are the same
/// file for include-once and cycle detection.
pub trait SourceFile: fmt::Debug + Send + Sync {
    fn path(&self) -> &Path;

    fn read_text(&self) -> Result<String, ReadError>;

    /// File name used as the include lookup key.
    fn file_name(&self) -> Option<&str> {
        self.path().file_name().and_then(|n| n.to_str())
    }
}

/// A source backed by a file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SourceFile for FileSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn read_text(&self) -> Result<String, ReadError> {
        Ok(std::fs::read_to_string(&self.path)?)
    }
}

/// A source held in memory. `None` text models a host that has no text for it.
#[derive(Debug, Clone)]
pub struct MemorySource {
    path: PathBuf,
    text: Option<String>,
}

impl MemorySource {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: Some(text.into()),
        }
    }

    pub fn without_text(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            text: None,
        }
    }
}

impl SourceFile for MemorySource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn read_text(&self) -> Result<String, ReadError> {
        self.text.clone().ok_or(ReadError::Missing)
    }
}

/// Include candidates grouped by file name.
#[derive(Debug, Default, Clone)]
pub struct IncludeLookup {
    by_name: HashMap<String, Vec<Arc<dyn SourceFile>>>,
}

impl IncludeLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a candidate. Sources without a UTF-8 file name are ignored.
    pub fn insert(&mut self, source: Arc<dyn SourceFile>) {
        if let Some(name) = source.file_name() {
            self.by_name
                .entry(name.to_string())
                .or_default()
                .push(source);
        }
    }

    /// All candidates registered under `file_name`.
    pub fn candidates(&self, file_name: &str) -> &[Arc<dyn SourceFile>] {
        self.by_name
            .get(file_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_name.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl FromIterator<Arc<dyn SourceFile>> for IncludeLookup {
    fn from_iter<I: IntoIterator<Item = Arc<dyn SourceFile>>>(iter: I) -> Self {
        let mut lookup = Self::new();
        for source in iter {
            lookup.insert(source);
        }
        lookup
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_groups_by_file_name() {
        let lookup: IncludeLookup = [
            Arc::new(MemorySource::new("/a/common.ttinc", "")) as Arc<dyn SourceFile>,
            Arc::new(MemorySource::new("/b/common.ttinc", "")),
            Arc::new(MemorySource::new("/b/other.ttinc", "")),
        ]
        .into_iter()
        .collect();

        assert_eq!(lookup.candidates("common.ttinc").len(), 2);
        assert_eq!(lookup.candidates("other.ttinc").len(), 1);
        assert!(lookup.candidates("missing.ttinc").is_empty());
        assert_eq!(lookup.len(), 3);
    }

    #[test]
    fn test_io_error_kinds() {
        let not_found = io::Error::from(io::ErrorKind::NotFound);
        assert!(matches!(ReadError::from(not_found), ReadError::NotFound));

        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(matches!(ReadError::from(denied), ReadError::PermissionDenied));

        let other = io::Error::other("boom");
        assert!(matches!(ReadError::from(other), ReadError::Io(_)));
    }

    #[test]
    fn test_memory_source_without_text() {
        let source = MemorySource::without_text("/x.ttinc");
        assert!(matches!(source.read_text(), Err(ReadError::Missing)));
    }

    #[test]
    fn test_file_source_missing_file() {
        let source = FileSource::new("/definitely/not/here.ttinc");
        assert!(matches!(source.read_text(), Err(ReadError::NotFound)));
    }
}
