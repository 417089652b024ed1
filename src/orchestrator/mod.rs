//! Drives media requests through their lifecycle.
//!
//! [`RequestOrchestrator`] consults the [`TransitionPolicy`] before touching a
//! record, serialises commands per request id, calls the prompt provider
//! under a timeout and reconciles every outcome into a persisted status.
//! Provider failures always end as a persisted `FAIL`; only store failures
//! reach the caller.

mod batch;
pub mod generation;
mod locks;
#[cfg(test)]
mod testing;

use std::time::Duration;

use tokio::time::timeout;

use crate::config::MediaflowConfig;
use crate::error::StoreError;
use crate::provider::{PromptProvider, PromptReply};
use crate::state_machine::{
    Command, MediaRequest, NewMediaRequest, RequestId, RequestStatus, TransitionPolicy,
};
use crate::store::{RecordOrder, RequestStore};

pub use batch::BatchReport;
pub use generation::{MediaGenerator, SimulatedGenerator, ThreadRandom};
use locks::RecordLocks;

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Upper bound for one prompt provider call.
    pub prompt_timeout: Duration,
    pub policy: TransitionPolicy,
    /// Requests generated at the same time during a batch.
    pub batch_concurrency: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            prompt_timeout: Duration::from_secs(60),
            policy: TransitionPolicy::strict(),
            batch_concurrency: 1,
        }
    }
}

impl OrchestratorSettings {
    pub fn from_config(config: &MediaflowConfig) -> Self {
        Self {
            prompt_timeout: config.provider.prompt_timeout(),
            policy: config.lifecycle.policy(),
            batch_concurrency: config.batch.concurrency.max(1),
        }
    }
}

/// Result of a per-request command. Absence is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied(MediaRequest),
    NotFound,
    /// The command is not legal from the request's current status. Nothing
    /// was written.
    InvalidTransition { current: RequestStatus },
}

#[cfg(test)]
impl CommandOutcome {
    pub fn into_record(self) -> Option<MediaRequest> {
        match self {
            CommandOutcome::Applied(record) => Some(record),
            _ => None,
        }
    }
}

enum Eligibility {
    Ready(MediaRequest),
    Refused(CommandOutcome),
}

pub struct RequestOrchestrator<S, P, G> {
    store: S,
    provider: P,
    generator: G,
    settings: OrchestratorSettings,
    locks: RecordLocks,
}

impl<S, P, G> RequestOrchestrator<S, P, G>
where
    S: RequestStore,
    P: PromptProvider,
    G: MediaGenerator,
{
    pub fn new(store: S, provider: P, generator: G, settings: OrchestratorSettings) -> Self {
        Self {
            store,
            provider,
            generator,
            settings,
            locks: RecordLocks::new(),
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Persists a new request in `NOT_YET`.
    pub async fn submit(&self, draft: NewMediaRequest) -> Result<MediaRequest, StoreError> {
        let record = self.store.insert(draft).await?;
        tracing::info!(
            request_id = %record.id,
            media_type = %record.media_type,
            scenario = %record.scenario_excerpt(50),
            "submitted media request"
        );
        Ok(record)
    }

    pub async fn find(&self, id: RequestId) -> Result<Option<MediaRequest>, StoreError> {
        self.store.get(id).await
    }

    /// All requests, newest first by `order`.
    pub async fn list_requests(&self, order: RecordOrder) -> Result<Vec<MediaRequest>, StoreError> {
        self.store.list_all(order).await
    }

    /// Moves a `NOT_YET` request to `GO`.
    pub async fn approve(&self, id: RequestId) -> Result<CommandOutcome, StoreError> {
        let _guard = self.locks.acquire(id).await;
        let mut request = match self.load_eligible(id, Command::Approve).await? {
            Eligibility::Ready(request) => request,
            Eligibility::Refused(outcome) => return Ok(outcome),
        };

        request.status = RequestStatus::Go;
        let saved = self.store.save(request).await?;
        tracing::info!(request_id = %id, "request approved");
        Ok(CommandOutcome::Applied(saved))
    }

    /// Formats the request's scenario into a prompt.
    ///
    /// On the executed path the store is written exactly twice: the
    /// `FORMATTING_PROMPT` marker before the provider call, then the
    /// `PROMPT_GENERATED` or `FAIL` result.
    pub async fn format_prompt(&self, id: RequestId) -> Result<CommandOutcome, StoreError> {
        let _guard = self.locks.acquire(id).await;
        let mut request = match self.load_eligible(id, Command::FormatPrompt).await? {
            Eligibility::Ready(request) => request,
            Eligibility::Refused(outcome) => return Ok(outcome),
        };

        request.begin_stage(RequestStatus::FormattingPrompt);
        let mut in_progress = self.store.save(request).await?;
        tracing::info!(request_id = %id, provider = self.provider.name(), "formatting prompt");

        let call = self
            .provider
            .generate_prompt(&in_progress.scenario, in_progress.media_type);
        let reply = timeout(self.settings.prompt_timeout, call).await;
        let settled = match reply {
            Ok(Ok(text)) => {
                match PromptReply::classify(text) {
                    PromptReply::Generated(prompt) => {
                        tracing::info!(
                            request_id = %id,
                            prompt = %crate::state_machine::excerpt(&prompt, 70),
                            "prompt generated"
                        );
                        in_progress.complete_formatting(prompt);
                    }
                    PromptReply::Rejected(message) => {
                        tracing::warn!(request_id = %id, reply = %message, "provider rejected the scenario");
                        in_progress.fail(message);
                    }
                }
                in_progress
            }
            Ok(Err(err)) => self.transport_failure(in_progress, err.to_string()).await?,
            Err(_) => {
                let detail = format!(
                    "no reply within {}s",
                    self.settings.prompt_timeout.as_secs_f64()
                );
                self.transport_failure(in_progress, detail).await?
            }
        };

        let saved = self.store.save(settled).await?;
        Ok(CommandOutcome::Applied(saved))
    }

    /// Builds the `FAIL` record for a provider call that did not complete.
    /// The record is re-read first so a concurrent update is not overwritten.
    async fn transport_failure(
        &self,
        in_progress: MediaRequest,
        detail: String,
    ) -> Result<MediaRequest, StoreError> {
        let id = in_progress.id;
        tracing::error!(request_id = %id, provider = self.provider.name(), error = %detail, "prompt provider call failed");
        let mut record = self.store.get(id).await?.unwrap_or(in_progress);
        record.fail(format!(
            "communication with {} failed while formatting the prompt: {detail}",
            self.provider.name()
        ));
        Ok(record)
    }

    async fn load_eligible(&self, id: RequestId, command: Command) -> Result<Eligibility, StoreError> {
        let Some(request) = self.store.get(id).await? else {
            tracing::warn!(request_id = %id, %command, "request not found");
            return Ok(Eligibility::Refused(CommandOutcome::NotFound));
        };
        if !self.settings.policy.allows(request.status, command) {
            tracing::warn!(
                request_id = %id,
                %command,
                status = %request.status,
                "command not allowed in current status"
            );
            return Ok(Eligibility::Refused(CommandOutcome::InvalidTransition {
                current: request.status,
            }));
        }
        Ok(Eligibility::Ready(request))
    }
}
