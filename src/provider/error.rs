//! Transport-level failures of a prompt provider call.
//!
//! A [`ProviderError`] means the call itself could not complete. Failures the
//! vendor reports in a normal reply travel in-band instead, as text starting
//! with [`IN_BAND_ERROR_PREFIX`](super::IN_BAND_ERROR_PREFIX).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP 429. Retried by [`RetryPolicy`](super::RetryPolicy) and never
    /// surfaced past it; callers see [`ProviderError::RetriesExhausted`].
    #[error("rate limited{}", retry_after_suffix(.retry_after_ms))]
    RateLimited { retry_after_ms: Option<u64> },

    /// Every attempt allowed by the retry policy hit a retryable failure.
    #[error("gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// Connection, DNS, TLS or body decoding failure.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientSetup(String),
}

impl ProviderError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::RateLimited { .. })
    }
}

fn retry_after_suffix(retry_after_ms: &Option<u64>) -> String {
    match retry_after_ms {
        Some(ms) => format!(", retry after {ms}ms"),
        None => String::new(),
    }
}
