use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{RecordOrder, RequestStore};
use crate::error::StoreError;
use crate::state_machine::{MediaRequest, NewMediaRequest, RequestId, RequestStatus};

/// Table of records plus the id sequence. Shared by the in-memory and the
/// JSON-file store.
#[derive(Debug, Clone, Default)]
pub(super) struct RecordTable {
    next_id: u64,
    records: BTreeMap<RequestId, MediaRequest>,
}

/// On-disk shape of a [`RecordTable`].
#[derive(Debug, Serialize, Deserialize)]
pub(super) struct Snapshot {
    pub next_id: u64,
    pub records: Vec<MediaRequest>,
}

impl RecordTable {
    pub(super) fn from_snapshot(snapshot: Snapshot) -> Self {
        let records: BTreeMap<_, _> = snapshot.records.into_iter().map(|r| (r.id, r)).collect();
        // Never hand out an id that is already taken, even if next_id was edited by hand.
        let highest = records.keys().next_back().map(|id| id.0).unwrap_or(0);
        Self {
            next_id: snapshot.next_id.max(highest),
            records,
        }
    }

    pub(super) fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            next_id: self.next_id,
            records: self.records.values().cloned().collect(),
        }
    }

    pub(super) fn get(&self, id: RequestId) -> Option<MediaRequest> {
        self.records.get(&id).cloned()
    }

    pub(super) fn insert(&mut self, draft: NewMediaRequest) -> MediaRequest {
        self.next_id += 1;
        let id = RequestId(self.next_id);
        let record = draft.into_record(id, Utc::now());
        self.records.insert(id, record.clone());
        record
    }

    pub(super) fn save(&mut self, mut record: MediaRequest) -> Result<MediaRequest, StoreError> {
        let stored = self
            .records
            .get(&record.id)
            .ok_or(StoreError::Missing(record.id))?;
        record.created_at = stored.created_at;
        record.status_updated_at = monotonic_now(stored.status_updated_at);
        self.records.insert(record.id, record.clone());
        Ok(record)
    }

    pub(super) fn list_by_status(&self, status: RequestStatus) -> Vec<MediaRequest> {
        self.records
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect()
    }

    pub(super) fn list_all(&self, order: RecordOrder) -> Vec<MediaRequest> {
        let mut records: Vec<_> = self.records.values().cloned().collect();
        match order {
            RecordOrder::CreationTime => {
                records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)))
            }
            RecordOrder::StatusUpdateTime => records.sort_by(|a, b| {
                b.status_updated_at
                    .cmp(&a.status_updated_at)
                    .then(b.id.cmp(&a.id))
            }),
        }
        records
    }
}

fn monotonic_now(previous: DateTime<Utc>) -> DateTime<Utc> {
    Utc::now().max(previous)
}

/// Process-local store. Useful for tests and one-shot runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: Mutex<RecordTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_table<T>(&self, f: impl FnOnce(&mut RecordTable) -> T) -> T {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *table)
    }
}

impl RequestStore for MemoryStore {
    async fn get(&self, id: RequestId) -> Result<Option<MediaRequest>, StoreError> {
        Ok(self.with_table(|t| t.get(id)))
    }

    async fn insert(&self, draft: NewMediaRequest) -> Result<MediaRequest, StoreError> {
        Ok(self.with_table(|t| t.insert(draft)))
    }

    async fn save(&self, record: MediaRequest) -> Result<MediaRequest, StoreError> {
        self.with_table(|t| t.save(record))
    }

    async fn list_by_status(&self, status: RequestStatus) -> Result<Vec<MediaRequest>, StoreError> {
        Ok(self.with_table(|t| t.list_by_status(status)))
    }

    async fn list_all(&self, order: RecordOrder) -> Result<Vec<MediaRequest>, StoreError> {
        Ok(self.with_table(|t| t.list_all(order)))
    }
}
