//! Status stores.
//!
//! A store remembers the last answer the platform gave for each category so
//! that, for example, a `Denied` survives a restart without prompting again.
//! The broker reads it once at startup and writes every persistable answer.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use warden_core::{Category, Status, StoreError};

/// Persistent key/value store of category statuses.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Load the stored status of `category`.
    async fn load(&self, category: Category) -> Result<Option<Status>, StoreError>;

    /// Store the status of `category`.
    async fn save(&self, category: Category, status: Status) -> Result<(), StoreError>;
}

/// A store that remembers nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStore;

#[async_trait]
impl StatusStore for NoopStore {
    async fn load(&self, _category: Category) -> Result<Option<Status>, StoreError> {
        Ok(None)
    }

    async fn save(&self, _category: Category, _status: Status) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_store_forgets() {
        let store = NoopStore;
        store.save(Category::Events, Status::Denied).await.unwrap();
        assert_eq!(store.load(Category::Events).await.unwrap(), None);
    }
}
