//! Prompt providers: services that turn a raw scenario into a structured
//! prompt for a generative media model.
//!
//! Every provider honours the same contract, so vendors are interchangeable
//! behind [`PromptProvider`]:
//!
//! - `Ok(text)` is either generated content or an in-band error whose text
//!   starts with [`IN_BAND_ERROR_PREFIX`]. Callers tell the two apart with
//!   [`PromptReply::classify`], never by error type.
//! - `Err(ProviderError)` means the call itself could not complete.
//! - Without usable credentials a provider answers with a labelled simulated
//!   prompt instead of failing.

pub mod error;
pub mod gemini;
pub mod openai;
mod retry;
mod simulated;

use std::future::Future;

use crate::config::{MediaflowConfig, ProviderKind};
use crate::state_machine::MediaType;

pub use error::ProviderError;
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;
pub use retry::RetryPolicy;
pub use simulated::{SimulatedProvider, is_unconfigured_key};

/// Prefix marking a provider reply as a failure report.
pub const IN_BAND_ERROR_PREFIX: &str = "Erreur";

pub trait PromptProvider: Send + Sync {
    /// Vendor name, for logs and error messages.
    fn name(&self) -> &str;

    fn generate_prompt(
        &self,
        scenario: &str,
        media_type: MediaType,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send;
}

/// A completed provider reply, classified by the in-band error convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptReply {
    Generated(String),
    /// The provider answered with a failure report (or nothing at all).
    Rejected(String),
}

impl PromptReply {
    pub fn classify(text: String) -> Self {
        if text.trim().is_empty() {
            PromptReply::Rejected(in_band_error("the prompt provider returned an empty reply"))
        } else if text.starts_with(IN_BAND_ERROR_PREFIX) {
            PromptReply::Rejected(text)
        } else {
            PromptReply::Generated(text)
        }
    }
}

/// Formats `detail` as an in-band error reply.
pub fn in_band_error(detail: impl std::fmt::Display) -> String {
    format!("{IN_BAND_ERROR_PREFIX}: {detail}")
}

/// Role description sent as the system message where a vendor supports one.
pub const SYSTEM_INSTRUCTION: &str = "You are an expert at writing prompts for generative image and \
video models. Your job is to turn raw scenarios into highly effective, detailed prompts.";

/// Builds the user instruction asking a model to expand `scenario` into a
/// structured prompt for `media_type`.
pub fn build_instruction(scenario: &str, media_type: MediaType) -> String {
    format!(
        "Write a detailed, optimised prompt for a generative AI (images/video) based on the \
         following scenario. The media to produce is of type '{media}'. \
         The scenario is:\n\"{scenario}\"\n\n\
         The prompt must include clear, actionable suggestions for:\n\
         - Characters (appearance, expressions, key actions).\n\
         - Visual composition and framing (e.g. close-up, wide shot, camera angle).\n\
         - Mood and lighting (e.g. dark and mysterious, bright and joyful, dominant colours).\n\
         - Art style (e.g. photorealistic, cartoon, oil painting, cyberpunk, epic fantasy).\n\
         - Key set elements and important objects.\n\
         Make sure the prompt is structured so an AI can interpret it easily, using relevant \
         keywords and avoiding ambiguity.",
        media = media_type.label(),
    )
}

/// The provider selected by configuration.
pub enum ConfiguredProvider {
    Simulated(SimulatedProvider),
    OpenAi(OpenAiClient),
    Gemini(GeminiClient),
}

impl ConfiguredProvider {
    pub fn from_config(config: &MediaflowConfig) -> Result<Self, ProviderError> {
        let retry = config.retry.policy();
        Ok(match config.provider.kind {
            ProviderKind::Simulated => ConfiguredProvider::Simulated(SimulatedProvider::selected()),
            ProviderKind::OpenAi => {
                ConfiguredProvider::OpenAi(OpenAiClient::new(config.openai.clone(), retry)?)
            }
            ProviderKind::Gemini => {
                ConfiguredProvider::Gemini(GeminiClient::new(config.gemini.clone(), retry)?)
            }
        })
    }
}

impl PromptProvider for ConfiguredProvider {
    fn name(&self) -> &str {
        match self {
            ConfiguredProvider::Simulated(p) => p.name(),
            ConfiguredProvider::OpenAi(p) => p.name(),
            ConfiguredProvider::Gemini(p) => p.name(),
        }
    }

    async fn generate_prompt(
        &self,
        scenario: &str,
        media_type: MediaType,
    ) -> Result<String, ProviderError> {
        match self {
            ConfiguredProvider::Simulated(p) => p.generate_prompt(scenario, media_type).await,
            ConfiguredProvider::OpenAi(p) => p.generate_prompt(scenario, media_type).await,
            ConfiguredProvider::Gemini(p) => p.generate_prompt(scenario, media_type).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_generated_text() {
        let reply = PromptReply::classify("A majestic dragon soaring...".into());
        assert_eq!(reply, PromptReply::Generated("A majestic dragon soaring...".into()));
    }

    #[test]
    fn classify_in_band_error() {
        let reply = PromptReply::classify("Erreur: rate limited".into());
        assert_eq!(reply, PromptReply::Rejected("Erreur: rate limited".into()));

        // The prefix alone is enough, whatever follows.
        let reply = PromptReply::classify("Erreur API OpenAI: 500".into());
        assert!(matches!(reply, PromptReply::Rejected(_)));
    }

    #[test]
    fn classify_empty_reply_as_rejected() {
        match PromptReply::classify("  \n".into()) {
            PromptReply::Rejected(msg) => assert!(msg.starts_with(IN_BAND_ERROR_PREFIX)),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn instruction_mentions_media_and_scenario() {
        let text = build_instruction("A dragon flies over a city", MediaType::Video);
        assert!(text.contains("of type 'video'"));
        assert!(text.contains("\"A dragon flies over a city\""));
        assert!(text.contains("Art style"));
    }

    #[test]
    fn configured_provider_follows_kind() {
        let mut config = MediaflowConfig::default();
        config.provider.kind = ProviderKind::Simulated;
        let provider = ConfiguredProvider::from_config(&config).unwrap();
        assert!(matches!(provider, ConfiguredProvider::Simulated(_)));
        assert_eq!(provider.name(), "simulated");

        config.provider.kind = ProviderKind::OpenAi;
        let provider = ConfiguredProvider::from_config(&config).unwrap();
        assert_eq!(provider.name(), "OpenAI");

        config.provider.kind = ProviderKind::Gemini;
        let provider = ConfiguredProvider::from_config(&config).unwrap();
        assert_eq!(provider.name(), "Gemini");
    }
}
