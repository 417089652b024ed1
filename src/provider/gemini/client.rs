use std::time::Duration;

use reqwest::{Client, StatusCode};

use super::types::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig};
use crate::config::GeminiSettings;
use crate::provider::retry::retry_after_ms;
use crate::provider::{
    PromptProvider, ProviderError, RetryPolicy, SimulatedProvider, build_instruction,
    in_band_error, is_unconfigured_key,
};
use crate::state_machine::{MediaType, excerpt};

const VENDOR: &str = "Gemini";

pub struct GeminiClient {
    settings: GeminiSettings,
    retry: RetryPolicy,
    client: Client,
    fallback: SimulatedProvider,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings, retry: RetryPolicy) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::ClientSetup(e.to_string()))?;
        Ok(Self {
            settings,
            retry,
            client,
            fallback: SimulatedProvider::new(VENDOR),
        })
    }

    pub fn is_configured(&self) -> bool {
        !is_unconfigured_key(&self.settings.api_key)
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }

    async fn send_once(&self, req: &GenerateContentRequest) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.settings.api_key)
            .json(req)
            .send()
            .await?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited {
                retry_after_ms: retry_after_ms(response.headers()),
            });
        }

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            tracing::error!(status = status.as_u16(), body = %body, "Gemini API error");
            return Ok(in_band_error(format!(
                "API {VENDOR} {} - {body}",
                status.as_u16()
            )));
        }

        let body = response.json::<GenerateContentResponse>().await?;
        Ok(self.reply_text(&body))
    }

    /// Maps a decoded response to reply text, turning safety blocks and empty
    /// answers into in-band errors.
    fn reply_text(&self, body: &GenerateContentResponse) -> String {
        if let Some(reason) = body.block_reason() {
            tracing::warn!(reason, "Gemini blocked the prompt");
            return in_band_error("prompt blocked by Gemini safety filters.");
        }
        if body.first_candidate_blocked() {
            tracing::warn!(model = %self.settings.model, "Gemini withheld the candidate for safety reasons");
            return in_band_error("candidate content blocked by Gemini safety filters.");
        }
        match body.text() {
            Some(text) => {
                tracing::info!(model = %self.settings.model, "received prompt from Gemini");
                text
            }
            None => {
                tracing::warn!(model = %self.settings.model, "empty or malformed reply from Gemini");
                in_band_error("empty or malformed reply from Gemini.")
            }
        }
    }
}

impl PromptProvider for GeminiClient {
    fn name(&self) -> &str {
        VENDOR
    }

    async fn generate_prompt(
        &self,
        scenario: &str,
        media_type: MediaType,
    ) -> Result<String, ProviderError> {
        if !self.is_configured() {
            return self.fallback.generate_prompt(scenario, media_type).await;
        }

        let req = GenerateContentRequest {
            contents: vec![Content::user_text(build_instruction(scenario, media_type))],
            generation_config: GenerationConfig {
                max_output_tokens: self.settings.max_output_tokens,
                temperature: self.settings.temperature,
            },
        };
        tracing::info!(
            model = %self.settings.model,
            scenario = %excerpt(scenario, 50),
            "sending prompt request to Gemini"
        );

        self.retry.run(VENDOR, || self.send_once(&req)).await
    }
}
