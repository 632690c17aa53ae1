//! Uniform entry iteration over bag containers.
//!
//! A bag can live on disk as a plain directory tree or as a single tar
//! archive. This crate provides one contract over both shapes: enumerate
//! entries without opening any streams, or read them one at a time with a
//! forward-only byte stream per entry.

use std::io;
use std::path::{Path, PathBuf};

mod dir;
mod tar;

pub use self::dir::DirectoryReader;
pub use self::tar::TarReader;

/// Sentinel registry key for unserialized bags.
pub const DIRECTORY: &str = "directory";

/// A single entry in a bag container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Relative path of the entry. Directory readers return forward-slashed
    /// paths relative to the bag root; tar readers return the in-archive
    /// path verbatim, including the leading bag directory.
    pub rel_path: String,
    /// Whether the entry is a regular file (directories are listed too).
    pub is_file: bool,
    /// Size in bytes; zero for directories.
    pub size: u64,
}

/// Consumer callback for [`BagReader::read`]. The reader does not advance
/// past the current entry until the callback returns.
pub type ReadFn<'a> = &'a mut dyn FnMut(&Entry, &mut dyn io::Read) -> io::Result<()>;

/// Iteration contract over a bag container.
pub trait BagReader: std::fmt::Debug {
    /// Enumerate entries without opening streams.
    fn list(&mut self) -> Result<Vec<Entry>, ReadError>;

    /// Visit each regular file with an opened, forward-only byte stream.
    ///
    /// The stream is only valid for the duration of the callback; the
    /// callback returning is the completion signal for the entry.
    fn read(&mut self, consume: ReadFn<'_>) -> Result<(), ReadError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("container not found at {0}")]
    NotFound(PathBuf),
    #[error("cannot read bag format of {path}; supported formats: {supported}")]
    UnsupportedFormat { path: PathBuf, supported: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ReadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ReadError::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the consumer callback asked the reader to stop early.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, ReadError::Io { source, .. } if source.kind() == io::ErrorKind::Interrupted)
    }
}

/// Factory producing a reader for a container path.
pub type ReaderFactory = fn(&Path) -> Result<Box<dyn BagReader>, ReadError>;

/// Maps container formats to reader factories.
///
/// Formats are keyed by file extension (`tar`) or the [`DIRECTORY`]
/// sentinel. Additional formats may be registered at runtime.
pub struct ReaderRegistry {
    factories: Vec<(String, ReaderFactory)>,
}

impl ReaderRegistry {
    pub fn new() -> Self {
        let mut registry = ReaderRegistry {
            factories: Vec::new(),
        };
        registry.register(DIRECTORY, |path| {
            Ok(Box::new(DirectoryReader::new(path)?) as Box<dyn BagReader>)
        });
        registry.register("tar", |path| {
            Ok(Box::new(TarReader::new(path)?) as Box<dyn BagReader>)
        });
        registry
    }

    /// Register a factory for an extension or sentinel, replacing any
    /// previous registration for the same key.
    pub fn register(&mut self, key: impl Into<String>, factory: ReaderFactory) {
        let key = key.into();
        self.factories.retain(|(k, _)| *k != key);
        self.factories.push((key, factory));
    }

    /// List of registered format keys, in registration order.
    pub fn formats(&self) -> Vec<&str> {
        self.factories.iter().map(|(k, _)| k.as_str()).collect()
    }

    /// Open a reader for `path`, picking the format from the path shape.
    pub fn open(&self, path: &Path) -> Result<Box<dyn BagReader>, ReadError> {
        if !path.exists() {
            return Err(ReadError::NotFound(path.to_path_buf()));
        }
        let key = if path.is_dir() {
            DIRECTORY.to_string()
        } else {
            path.extension()
                .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
                .unwrap_or_default()
        };
        match self.factories.iter().find(|(k, _)| *k == key) {
            Some((_, factory)) => factory(path),
            None => Err(ReadError::UnsupportedFormat {
                path: path.to_path_buf(),
                supported: self.formats().join(", "),
            }),
        }
    }
}

impl Default for ReaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn registry_rejects_unknown_format() {
        let mut file = tempfile::Builder::new()
            .suffix(".zip")
            .tempfile()
            .unwrap();
        file.write_all(b"PK").unwrap();

        let registry = ReaderRegistry::new();
        let err = registry.open(file.path()).unwrap_err();
        assert!(matches!(err, ReadError::UnsupportedFormat { .. }));
        assert!(err.to_string().contains("tar"));
    }

    #[test]
    fn registry_reports_missing_container() {
        let registry = ReaderRegistry::new();
        let err = registry.open(Path::new("/no/such/bag")).unwrap_err();
        assert!(matches!(err, ReadError::NotFound(_)));
    }

    #[test]
    fn registry_accepts_new_formats() {
        let mut registry = ReaderRegistry::new();
        registry.register("tgz", |path| {
            Err(ReadError::UnsupportedFormat {
                path: path.to_path_buf(),
                supported: "none".into(),
            })
        });
        assert!(registry.formats().contains(&"tgz"));
    }
}
