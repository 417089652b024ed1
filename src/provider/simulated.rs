use std::time::Duration;

use tokio::time::sleep;

use super::{PromptProvider, ProviderError};
use crate::state_machine::MediaType;

/// Delay before a simulated prompt is returned, mimicking a network round trip.
pub const SIMULATION_DELAY: Duration = Duration::from_millis(500);

/// Keys treated as "not configured".
const PLACEHOLDER_KEYS: &[&str] = &["SIMULATED_KEY_PLACEHOLDER", "changeme"];

/// Whether `key` is missing or one of the known placeholders.
pub fn is_unconfigured_key(key: &str) -> bool {
    let key = key.trim();
    key.is_empty() || PLACEHOLDER_KEYS.iter().any(|p| key.eq_ignore_ascii_case(p))
}

/// Builds the clearly labelled stand-in prompt. `reason` says why no vendor
/// was called.
pub fn simulated_prompt(reason: &str, scenario: &str, media_type: MediaType) -> String {
    format!(
        "--- SIMULATED PROMPT ({reason}) ---\n\
         Target media: {media_type}\n\
         Original scenario:\n\"{scenario}\"\n\n\
         Instructions (simulated):\n\
         1. Analyse the scenario.\n\
         2. Propose a detailed prompt structure for generating '{media}' media.\n\
         --- END OF SIMULATED PROMPT ---",
        media = media_type.label(),
    )
}

/// Provider that never leaves the process. Used when no vendor is selected and
/// as the degraded path of vendor clients without credentials.
#[derive(Debug, Clone)]
pub struct SimulatedProvider {
    vendor: String,
    reason: String,
    delay: Duration,
}

impl SimulatedProvider {
    /// Stand-in for `vendor` when its API key is missing.
    pub fn new(vendor: impl Into<String>) -> Self {
        let vendor = vendor.into();
        Self {
            reason: format!("{vendor} API key not configured"),
            vendor,
            delay: SIMULATION_DELAY,
        }
    }

    /// The provider chosen with `kind = "simulated"`.
    pub fn selected() -> Self {
        Self {
            vendor: "simulated".to_string(),
            reason: "simulated provider selected".to_string(),
            delay: SIMULATION_DELAY,
        }
    }

    #[cfg(test)]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl PromptProvider for SimulatedProvider {
    fn name(&self) -> &str {
        &self.vendor
    }

    async fn generate_prompt(
        &self,
        scenario: &str,
        media_type: MediaType,
    ) -> Result<String, ProviderError> {
        tracing::warn!(vendor = %self.vendor, reason = %self.reason, "returning simulated prompt");
        sleep(self.delay).await;
        Ok(simulated_prompt(&self.reason, scenario, media_type))
    }
}
