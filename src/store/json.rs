use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use super::memory::{RecordTable, Snapshot};
use super::{RecordOrder, RequestStore};
use crate::error::StoreError;
use crate::state_machine::{MediaRequest, NewMediaRequest, RequestId, RequestStatus};

/// Store persisting every write as a JSON snapshot on disk.
///
/// Writes go to a sibling temp file which is then renamed over the target,
/// so a crash mid-write leaves the previous snapshot intact. A failed write
/// is rolled back in memory and reported as a [`StoreError`].
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    table: Mutex<RecordTable>,
}

impl JsonFileStore {
    /// Opens the store at `path`, starting empty if the file does not exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let table = match tokio::fs::read(&path).await {
            Ok(bytes) => RecordTable::from_snapshot(serde_json::from_slice::<Snapshot>(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RecordTable::default(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), "opened request store");
        Ok(Self {
            path,
            table: Mutex::new(table),
        })
    }

    async fn persist(&self, table: &RecordTable) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(&table.to_snapshot())?;
        let tmp = self.path.with_extension("json.tmp");
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Applies `change` and persists, restoring the previous table on failure.
    async fn mutate<T>(
        &self,
        change: impl FnOnce(&mut RecordTable) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut table = self.table.lock().await;
        let before = table.clone();
        let value = change(&mut *table)?;
        if let Err(e) = self.persist(&table).await {
            *table = before;
            tracing::error!(path = %self.path.display(), error = %e, "failed to persist request store");
            return Err(e);
        }
        Ok(value)
    }
}

impl RequestStore for JsonFileStore {
    async fn get(&self, id: RequestId) -> Result<Option<MediaRequest>, StoreError> {
        Ok(self.table.lock().await.get(id))
    }

    async fn insert(&self, draft: NewMediaRequest) -> Result<MediaRequest, StoreError> {
        self.mutate(|t| Ok(t.insert(draft))).await
    }

    async fn save(&self, record: MediaRequest) -> Result<MediaRequest, StoreError> {
        self.mutate(|t| t.save(record)).await
    }

    async fn list_by_status(&self, status: RequestStatus) -> Result<Vec<MediaRequest>, StoreError> {
        Ok(self.table.lock().await.list_by_status(status))
    }

    async fn list_all(&self, order: RecordOrder) -> Result<Vec<MediaRequest>, StoreError> {
        Ok(self.table.lock().await.list_all(order))
    }
}
