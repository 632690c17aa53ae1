//! Persistence interface consumed by callers.
//!
//! The engine never stores anything itself; hosts hand it profiles and take
//! back results. This trait is the seam a host's storage plugs into.

use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Error)]
#[error("repository error: {0}")]
pub struct RepoError(pub String);

/// A generic keyed store.
pub trait Repository<T> {
    fn save(&mut self, id: &str, item: &T) -> Result<(), RepoError>;
    fn load(&self, id: &str) -> Result<Option<T>, RepoError>;
    fn list_ids(&self) -> Result<Vec<String>, RepoError>;
    fn delete(&mut self, id: &str) -> Result<(), RepoError>;
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryRepository<T> {
    items: BTreeMap<String, T>,
}

impl<T> MemoryRepository<T> {
    pub fn new() -> Self {
        MemoryRepository {
            items: BTreeMap::new(),
        }
    }
}

impl<T: Clone> Repository<T> for MemoryRepository<T> {
    fn save(&mut self, id: &str, item: &T) -> Result<(), RepoError> {
        self.items.insert(id.to_string(), item.clone());
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Option<T>, RepoError> {
        Ok(self.items.get(id).cloned())
    }

    fn list_ids(&self) -> Result<Vec<String>, RepoError> {
        Ok(self.items.keys().cloned().collect())
    }

    fn delete(&mut self, id: &str) -> Result<(), RepoError> {
        self.items.remove(id);
        Ok(())
    }
}
