use super::StatusStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use warden_core::{Category, Status, StoreError};

/// In-memory status store.
///
/// Outlives any single broker when shared through an `Arc`, which makes it
/// a convenient stand-in for persistent storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    statuses: RwLock<HashMap<Category, Status>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `entries`.
    pub fn with_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Category, Status)>,
    {
        Self {
            statuses: RwLock::new(entries.into_iter().collect()),
        }
    }

    /// Snapshot of everything stored.
    pub fn entries(&self) -> HashMap<Category, Status> {
        self.statuses.read().clone()
    }
}

#[async_trait]
impl StatusStore for MemoryStore {
    async fn load(&self, category: Category) -> Result<Option<Status>, StoreError> {
        Ok(self.statuses.read().get(&category).copied())
    }

    async fn save(&self, category: Category, status: Status) -> Result<(), StoreError> {
        self.statuses.write().insert(category, status);
        Ok(())
    }
}
