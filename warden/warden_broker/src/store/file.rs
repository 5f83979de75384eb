use super::StatusStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use warden_core::{Category, Status, StoreError};

/// JSON file store keyed by category code.
///
/// The file is a single object mapping codes to statuses:
///
/// ```json
/// { "3200": "authorized", "4000": "denied" }
/// ```
///
/// The whole file is read and validated when the store is opened, so an
/// unknown category code fails the broker at startup instead of being
/// silently dropped. Writes go to a temporary file that is renamed over the
/// target.
pub struct FileStore {
    path: PathBuf,
    statuses: RwLock<BTreeMap<Category, Status>>,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let statuses = match tokio::fs::read(&path).await {
            Ok(data) => Self::decode(&data)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "status file does not exist yet");
                BTreeMap::new()
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        Ok(Self {
            path,
            statuses: RwLock::new(statuses),
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of everything stored.
    pub fn entries(&self) -> BTreeMap<Category, Status> {
        self.statuses.read().clone()
    }

    fn decode(data: &[u8]) -> Result<BTreeMap<Category, Status>, StoreError> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(BTreeMap::new());
        }

        let raw: BTreeMap<String, Status> = serde_json::from_slice(data)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut statuses = BTreeMap::new();
        for (key, status) in raw {
            let category = key
                .parse::<u32>()
                .ok()
                .and_then(|code| Category::try_from(code).ok())
                .ok_or_else(|| StoreError::UnknownCategory(key.clone()))?;

            if status == Status::Pending {
                warn!(category = %category, "discarding stored pending status");
                continue;
            }
            statuses.insert(category, status);
        }

        Ok(statuses)
    }

    fn encode(statuses: &BTreeMap<Category, Status>) -> Result<Vec<u8>, StoreError> {
        let raw: BTreeMap<String, Status> = statuses
            .iter()
            .map(|(category, status)| (category.code().to_string(), *status))
            .collect();
        serde_json::to_vec_pretty(&raw).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    async fn write_file(&self, data: &[u8]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, data).await?;

        let file = tokio::fs::File::open(&temp_path).await?;
        file.sync_all().await?;

        tokio::fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl StatusStore for FileStore {
    async fn load(&self, category: Category) -> Result<Option<Status>, StoreError> {
        Ok(self.statuses.read().get(&category).copied())
    }

    async fn save(&self, category: Category, status: Status) -> Result<(), StoreError> {
        if !status.is_persistable() {
            return Err(StoreError::Serialization(format!(
                "status {} cannot be stored",
                status
            )));
        }

        // Holding the write lock keeps file writes in the same order as the
        // in-memory updates.
        let _guard = self.write_lock.lock().await;
        let data = {
            let mut statuses = self.statuses.write();
            statuses.insert(category, status);
            Self::encode(&statuses)?
        };

        self.write_file(&data).await
    }
}
