//! Durable keyed storage for media requests.
//!
//! [`RequestStore`] is the only shared mutable resource the orchestrator
//! touches. Stores own the timestamps: `insert` assigns the id and
//! `created_at`, every `save` bumps `status_updated_at` (never backwards).
//! Together `insert` and `save` form the upsert of the request record.

mod json;
mod memory;

use std::future::Future;

use crate::config::{StoreKind, StoreSettings};
use crate::error::StoreError;
use crate::state_machine::{MediaRequest, NewMediaRequest, RequestId, RequestStatus};

pub use json::JsonFileStore;
pub use memory::MemoryStore;

/// Sort key for [`RequestStore::list_all`]. Listings are always newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordOrder {
    #[default]
    CreationTime,
    StatusUpdateTime,
}

pub trait RequestStore: Send + Sync {
    fn get(
        &self,
        id: RequestId,
    ) -> impl Future<Output = Result<Option<MediaRequest>, StoreError>> + Send;

    /// Persists a new record in `NOT_YET`, assigning its id and creation time.
    fn insert(
        &self,
        draft: NewMediaRequest,
    ) -> impl Future<Output = Result<MediaRequest, StoreError>> + Send;

    /// Overwrites an existing record and returns the stored copy.
    /// `created_at` is kept from the stored record.
    fn save(
        &self,
        record: MediaRequest,
    ) -> impl Future<Output = Result<MediaRequest, StoreError>> + Send;

    fn list_by_status(
        &self,
        status: RequestStatus,
    ) -> impl Future<Output = Result<Vec<MediaRequest>, StoreError>> + Send;

    fn list_all(
        &self,
        order: RecordOrder,
    ) -> impl Future<Output = Result<Vec<MediaRequest>, StoreError>> + Send;
}

/// The store selected by configuration.
pub enum ConfiguredStore {
    Json(JsonFileStore),
    Memory(MemoryStore),
}

impl ConfiguredStore {
    pub async fn from_config(settings: &StoreSettings) -> Result<Self, StoreError> {
        Ok(match settings.kind {
            StoreKind::Json => ConfiguredStore::Json(JsonFileStore::open(&settings.path).await?),
            StoreKind::Memory => {
                tracing::warn!("using the in-memory store, requests are dropped on exit");
                ConfiguredStore::Memory(MemoryStore::new())
            }
        })
    }
}

impl RequestStore for ConfiguredStore {
    async fn get(&self, id: RequestId) -> Result<Option<MediaRequest>, StoreError> {
        match self {
            ConfiguredStore::Json(s) => s.get(id).await,
            ConfiguredStore::Memory(s) => s.get(id).await,
        }
    }

    async fn insert(&self, draft: NewMediaRequest) -> Result<MediaRequest, StoreError> {
        match self {
            ConfiguredStore::Json(s) => s.insert(draft).await,
            ConfiguredStore::Memory(s) => s.insert(draft).await,
        }
    }

    async fn save(&self, record: MediaRequest) -> Result<MediaRequest, StoreError> {
        match self {
            ConfiguredStore::Json(s) => s.save(record).await,
            ConfiguredStore::Memory(s) => s.save(record).await,
        }
    }

    async fn list_by_status(&self, status: RequestStatus) -> Result<Vec<MediaRequest>, StoreError> {
        match self {
            ConfiguredStore::Json(s) => s.list_by_status(status).await,
            ConfiguredStore::Memory(s) => s.list_by_status(status).await,
        }
    }

    async fn list_all(&self, order: RecordOrder) -> Result<Vec<MediaRequest>, StoreError> {
        match self {
            ConfiguredStore::Json(s) => s.list_all(order).await,
            ConfiguredStore::Memory(s) => s.list_all(order).await,
        }
    }
}
