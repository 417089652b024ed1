use thiserror::Error;

use crate::provider::ProviderError;
use crate::state_machine::RequestId;

#[derive(Debug, Error)]
pub enum MediaflowError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Request not found: {0}")]
    RequestNotFound(RequestId),

    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Rejections raised while building a submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("scenario must not be empty")]
    EmptyScenario,
}

/// Failures of the request store. These are the only errors the orchestrator
/// hands back to its caller.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot save unknown request {0}")]
    Missing(RequestId),

    #[error("store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store data is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Failure of the media generation stage for a single request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("{0}")]
    Failed(String),

    #[error("generation was interrupted")]
    Interrupted,
}
