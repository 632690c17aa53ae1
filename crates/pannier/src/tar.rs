//! Tar-archive reader.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::{BagReader, Entry, ReadError, ReadFn};

/// Reads a bag serialized as a single uncompressed tar archive.
///
/// In-archive paths are returned verbatim, including the leading bag
/// directory; stripping it is the caller's concern. Tar streams are
/// forward-only, so each pass opens a fresh archive handle.
#[derive(Debug)]
pub struct TarReader {
    path: PathBuf,
}

impl TarReader {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, ReadError> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(ReadError::NotFound(path));
        }
        Ok(TarReader { path })
    }

    fn open_archive(&self) -> Result<::tar::Archive<File>, ReadError> {
        let file = File::open(&self.path).map_err(|e| ReadError::io(&self.path, e))?;
        Ok(::tar::Archive::new(file))
    }

    fn entry_of(header: &::tar::Header, rel_path: String) -> Option<Entry> {
        let entry_type = header.entry_type();
        if entry_type.is_dir() {
            return Some(Entry {
                rel_path: rel_path.trim_end_matches('/').to_string(),
                is_file: false,
                size: 0,
            });
        }
        if !entry_type.is_file() {
            info!(path = %rel_path, "Skipping non-regular archive entry");
            return None;
        }
        Some(Entry {
            rel_path,
            is_file: true,
            size: header.size().unwrap_or(0),
        })
    }
}

impl BagReader for TarReader {
    fn list(&mut self) -> Result<Vec<Entry>, ReadError> {
        let mut archive = self.open_archive()?;
        let mut entries = Vec::new();
        for item in archive.entries().map_err(|e| ReadError::io(&self.path, e))? {
            let item = item.map_err(|e| ReadError::io(&self.path, e))?;
            let rel_path = item
                .path()
                .map_err(|e| ReadError::io(&self.path, e))?
                .to_string_lossy()
                .replace('\\', "/");
            if let Some(entry) = Self::entry_of(item.header(), rel_path) {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    fn read(&mut self, consume: ReadFn<'_>) -> Result<(), ReadError> {
        let mut archive = self.open_archive()?;
        for item in archive.entries().map_err(|e| ReadError::io(&self.path, e))? {
            let mut item = item.map_err(|e| ReadError::io(&self.path, e))?;
            let rel_path = item
                .path()
                .map_err(|e| ReadError::io(&self.path, e))?
                .to_string_lossy()
                .replace('\\', "/");
            let Some(entry) = Self::entry_of(item.header(), rel_path) else {
                continue;
            };
            if !entry.is_file {
                continue;
            }
            consume(&entry, &mut item).map_err(|e| ReadError::io(&self.path, e))?;
        }
        Ok(())
    }
}
