use std::panic::AssertUnwindSafe;

use futures::{FutureExt, StreamExt, stream};

use super::RequestOrchestrator;
use super::generation::MediaGenerator;
use crate::error::{GenerationError, StoreError};
use crate::provider::PromptProvider;
use crate::state_machine::{Command, RequestId, RequestStatus};
use crate::store::RequestStore;

/// Tally of one [`RequestOrchestrator::process_pending_batch`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Requests that reached a terminal status.
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Requests that left `GO` between the snapshot and their turn.
    pub skipped: usize,
    /// Requests abandoned because the store rejected a write.
    pub errored: usize,
}

impl BatchReport {
    fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Succeeded => {
                self.processed += 1;
                self.succeeded += 1;
            }
            ItemOutcome::Failed => {
                self.processed += 1;
                self.failed += 1;
            }
            ItemOutcome::Skipped => self.skipped += 1,
            ItemOutcome::Errored => self.errored += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    Succeeded,
    Failed,
    Skipped,
    Errored,
}

impl<S, P, G> RequestOrchestrator<S, P, G>
where
    S: RequestStore,
    P: PromptProvider,
    G: MediaGenerator,
{
    /// Runs the generation stage for every request currently in `GO`.
    ///
    /// Each request moves to `RUNNING`, then to `SUCCESS` or `FAIL`. One
    /// request failing, panicking or hitting a store error does not stop the
    /// others. Only the initial `GO` query can fail the whole batch.
    pub async fn process_pending_batch(&self) -> Result<BatchReport, StoreError> {
        let pending = self.store.list_by_status(RequestStatus::Go).await?;
        if pending.is_empty() {
            tracing::info!("no pending requests");
            return Ok(BatchReport::default());
        }

        let concurrency = self.settings.batch_concurrency.max(1);
        tracing::info!(count = pending.len(), concurrency, "processing pending requests");

        let outcomes: Vec<ItemOutcome> = stream::iter(pending.into_iter().map(|request| request.id))
            .map(|id| self.process_one(id))
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut report = BatchReport::default();
        for outcome in outcomes {
            report.record(outcome);
        }
        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            errored = report.errored,
            "batch finished"
        );
        Ok(report)
    }

    async fn process_one(&self, id: RequestId) -> ItemOutcome {
        match self.generate_for(id).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(request_id = %id, error = %err, "store error while processing request");
                self.abandon(id, &err).await;
                ItemOutcome::Errored
            }
        }
    }

    async fn generate_for(&self, id: RequestId) -> Result<ItemOutcome, StoreError> {
        let _guard = self.locks.acquire(id).await;
        let Some(mut request) = self.store.get(id).await? else {
            return Ok(ItemOutcome::Skipped);
        };
        if !self.settings.policy.allows(request.status, Command::Generate) {
            tracing::debug!(request_id = %id, status = %request.status, "request left GO, skipping");
            return Ok(ItemOutcome::Skipped);
        }

        request.begin_stage(RequestStatus::Running);
        let mut running = self.store.save(request).await?;
        tracing::info!(request_id = %id, media_type = %running.media_type, "generating media");

        let result = AssertUnwindSafe(self.generator.generate(&running))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(GenerationError::Interrupted));

        let outcome = match result {
            Ok(path) => {
                tracing::info!(request_id = %id, path = %path, "media generated");
                running.complete_generation(path);
                ItemOutcome::Succeeded
            }
            Err(err) => {
                tracing::warn!(request_id = %id, error = %err, "media generation failed");
                running.fail(err.to_string());
                ItemOutcome::Failed
            }
        };
        self.store.save(running).await?;
        Ok(outcome)
    }

    /// Best-effort `FAIL` for a request whose stage could not be recorded.
    async fn abandon(&self, id: RequestId, cause: &StoreError) {
        let _guard = self.locks.acquire(id).await;
        let mut request = match self.store.get(id).await {
            Ok(Some(request)) if request.status == RequestStatus::Running => request,
            _ => return,
        };
        request.fail(format!("generation result could not be stored: {cause}"));
        if let Err(err) = self.store.save(request).await {
            tracing::warn!(request_id = %id, error = %err, "could not mark request as failed");
        }
    }
}
