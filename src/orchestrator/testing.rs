//! Stubs shared by the orchestrator tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use super::generation::MediaGenerator;
use super::{OrchestratorSettings, RequestOrchestrator};
use crate::error::{GenerationError, StoreError};
use crate::provider::{PromptProvider, ProviderError};
use crate::state_machine::{
    MediaRequest, MediaType, NewMediaRequest, RequestId, RequestStatus, TargetPlatform,
};
use crate::store::{MemoryStore, RecordOrder, RequestStore};

pub enum StubReply {
    Text(String),
    Delayed(String, Duration),
    Transport,
    /// Changes the stored record mid-call, then fails like `Transport`.
    TransportAfter(RecordingStore, Interference),
    Hang,
}

fn transport_error() -> ProviderError {
    ProviderError::RetriesExhausted {
        attempts: 4,
        last_error: "rate limited".into(),
    }
}

pub struct StubProvider {
    reply: StubReply,
    calls: AtomicU32,
}

impl StubProvider {
    pub fn replying(text: &str) -> Self {
        Self::new(StubReply::Text(text.into()))
    }

    pub fn new(reply: StubReply) -> Self {
        Self {
            reply,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PromptProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn generate_prompt(
        &self,
        _scenario: &str,
        _media_type: MediaType,
    ) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            StubReply::Text(text) => Ok(text.clone()),
            StubReply::Delayed(text, delay) => {
                tokio::time::sleep(*delay).await;
                Ok(text.clone())
            }
            StubReply::Transport => Err(transport_error()),
            StubReply::TransportAfter(store, interference) => {
                store.interfere(*interference).await;
                Err(transport_error())
            }
            StubReply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok("too late".into())
            }
        }
    }
}

/// A write made behind the orchestrator's back.
#[derive(Clone, Copy)]
pub enum Interference {
    Edit(RequestId, fn(&mut MediaRequest)),
    /// Hides the record from every later read.
    Remove(RequestId),
}

#[derive(Default)]
struct RecordingState {
    inner: MemoryStore,
    saves: Mutex<Vec<(RequestId, RequestStatus)>>,
    failing_saves: Mutex<HashSet<RequestId>>,
    removed: Mutex<HashSet<RequestId>>,
    unavailable: Mutex<bool>,
}

/// Memory store that records every save and can be told to fail. Clones
/// share the same records.
#[derive(Clone, Default)]
pub struct RecordingStore {
    state: Arc<RecordingState>,
}

impl RecordingStore {
    pub fn saves(&self) -> Vec<(RequestId, RequestStatus)> {
        self.state.saves.lock().unwrap().clone()
    }

    pub fn saved_statuses(&self, id: RequestId) -> Vec<RequestStatus> {
        self.saves()
            .into_iter()
            .filter(|(saved, _)| *saved == id)
            .map(|(_, status)| status)
            .collect()
    }

    pub fn fail_saves_for(&self, id: RequestId) {
        self.state.failing_saves.lock().unwrap().insert(id);
    }

    pub fn go_down(&self) {
        *self.state.unavailable.lock().unwrap() = true;
    }

    /// Writes `record` as-is, bypassing the recorded save path.
    pub async fn force(&self, record: MediaRequest) {
        self.state.inner.save(record).await.unwrap();
    }

    pub async fn interfere(&self, interference: Interference) {
        match interference {
            Interference::Edit(id, edit) => {
                let mut record = self.state.inner.get(id).await.unwrap().unwrap();
                edit(&mut record);
                self.force(record).await;
            }
            Interference::Remove(id) => {
                self.state.removed.lock().unwrap().insert(id);
            }
        }
    }

    fn check_up(&self) -> Result<(), StoreError> {
        if *self.state.unavailable.lock().unwrap() {
            Err(StoreError::Io(std::io::Error::other("test store is down")))
        } else {
            Ok(())
        }
    }
}

impl RequestStore for RecordingStore {
    async fn get(&self, id: RequestId) -> Result<Option<MediaRequest>, StoreError> {
        self.check_up()?;
        if self.state.removed.lock().unwrap().contains(&id) {
            return Ok(None);
        }
        self.state.inner.get(id).await
    }

    async fn insert(&self, draft: NewMediaRequest) -> Result<MediaRequest, StoreError> {
        self.check_up()?;
        self.state.inner.insert(draft).await
    }

    async fn save(&self, record: MediaRequest) -> Result<MediaRequest, StoreError> {
        self.check_up()?;
        if self.state.failing_saves.lock().unwrap().contains(&record.id) {
            return Err(StoreError::Io(std::io::Error::other(format!(
                "cannot write {}",
                record.id
            ))));
        }
        self.state.saves.lock().unwrap().push((record.id, record.status));
        self.state.inner.save(record).await
    }

    async fn list_by_status(&self, status: RequestStatus) -> Result<Vec<MediaRequest>, StoreError> {
        self.check_up()?;
        self.state.inner.list_by_status(status).await
    }

    async fn list_all(&self, order: RecordOrder) -> Result<Vec<MediaRequest>, StoreError> {
        self.check_up()?;
        self.state.inner.list_all(order).await
    }
}

pub enum ScriptedOutcome {
    Success,
    /// Succeeds after changing another stored record.
    SucceedAfter(RecordingStore, Interference),
    Failure(&'static str),
    Panic,
}

/// Generator whose outcome is fixed per request id. Unscripted ids succeed.
#[derive(Default)]
pub struct ScriptedGenerator {
    outcomes: HashMap<RequestId, ScriptedOutcome>,
    seen: Mutex<Vec<RequestId>>,
}

impl ScriptedGenerator {
    pub fn with(mut self, id: RequestId, outcome: ScriptedOutcome) -> Self {
        self.outcomes.insert(id, outcome);
        self
    }

    pub fn seen(&self) -> Vec<RequestId> {
        self.seen.lock().unwrap().clone()
    }
}

impl MediaGenerator for ScriptedGenerator {
    async fn generate(&self, request: &MediaRequest) -> Result<String, GenerationError> {
        self.seen.lock().unwrap().push(request.id);
        match self.outcomes.get(&request.id) {
            None | Some(ScriptedOutcome::Success) => Ok(format!("/out/media_{}.mp4", request.id)),
            Some(ScriptedOutcome::SucceedAfter(store, interference)) => {
                store.interfere(*interference).await;
                Ok(format!("/out/media_{}.mp4", request.id))
            }
            Some(ScriptedOutcome::Failure(msg)) => Err(GenerationError::Failed((*msg).into())),
            Some(ScriptedOutcome::Panic) => panic!("generator blew up"),
        }
    }
}

pub type TestOrchestrator = RequestOrchestrator<RecordingStore, StubProvider, ScriptedGenerator>;

pub fn orchestrator(provider: StubProvider) -> TestOrchestrator {
    orchestrator_with(provider, ScriptedGenerator::default(), OrchestratorSettings::default())
}

pub fn orchestrator_with(
    provider: StubProvider,
    generator: ScriptedGenerator,
    settings: OrchestratorSettings,
) -> TestOrchestrator {
    orchestrator_on(RecordingStore::default(), provider, generator, settings)
}

/// Builds an orchestrator over `store`, so stubs holding a clone of it can
/// write concurrently.
pub fn orchestrator_on(
    store: RecordingStore,
    provider: StubProvider,
    generator: ScriptedGenerator,
    settings: OrchestratorSettings,
) -> TestOrchestrator {
    RequestOrchestrator::new(store, provider, generator, settings)
}

pub fn draft(scenario: &str) -> NewMediaRequest {
    NewMediaRequest::new(scenario, ["Gemini"], MediaType::Video, TargetPlatform::Tiktok).unwrap()
}

/// Submits a request and forces it into `status` without recording the write.
pub async fn seeded(orch: &TestOrchestrator, status: RequestStatus) -> MediaRequest {
    let mut record = orch.submit(draft("A dragon flies over a city")).await.unwrap();
    record.status = status;
    orch.store().force(record.clone()).await;
    record
}
