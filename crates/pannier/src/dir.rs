//! Directory-tree reader.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::info;
use walkdir::WalkDir;

use crate::{BagReader, Entry, ReadError, ReadFn};

/// Reads a bag laid out as a plain directory tree.
///
/// Paths are returned forward-slashed and relative to the bag root. Symlinks
/// and other non-regular entries are skipped with an informational log.
#[derive(Debug)]
pub struct DirectoryReader {
    root: PathBuf,
}

impl DirectoryReader {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, ReadError> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(ReadError::NotFound(root));
        }
        Ok(DirectoryReader { root })
    }

    fn rel_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    fn walk(&self) -> Result<Vec<(PathBuf, Entry)>, ReadError> {
        let mut entries = Vec::new();
        for dirent in WalkDir::new(&self.root) {
            let dirent = dirent.map_err(|e| {
                let path = e.path().unwrap_or(&self.root).to_path_buf();
                ReadError::io(path, e.into())
            })?;
            if dirent.depth() == 0 {
                continue;
            }
            let file_type = dirent.file_type();
            if file_type.is_symlink() || !(file_type.is_file() || file_type.is_dir()) {
                info!(path = ?dirent.path(), "Skipping non-regular entry");
                continue;
            }
            let size = if file_type.is_file() {
                dirent
                    .metadata()
                    .map_err(|e| ReadError::io(dirent.path(), e.into()))?
                    .len()
            } else {
                0
            };
            entries.push((
                dirent.path().to_path_buf(),
                Entry {
                    rel_path: self.rel_path(dirent.path()),
                    is_file: file_type.is_file(),
                    size,
                },
            ));
        }
        Ok(entries)
    }
}

impl BagReader for DirectoryReader {
    fn list(&mut self) -> Result<Vec<Entry>, ReadError> {
        Ok(self.walk()?.into_iter().map(|(_, entry)| entry).collect())
    }

    fn read(&mut self, consume: ReadFn<'_>) -> Result<(), ReadError> {
        for (path, entry) in self.walk()? {
            if !entry.is_file {
                continue;
            }
            let mut file = File::open(&path).map_err(|e| ReadError::io(&path, e))?;
            consume(&entry, &mut file).map_err(|e| ReadError::io(&path, e))?;
        }
        Ok(())
    }
}
