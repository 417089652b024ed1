use std::time::Duration;

use reqwest::{Client, StatusCode};

use super::types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
use crate::config::OpenAiSettings;
use crate::provider::retry::retry_after_ms;
use crate::provider::{
    PromptProvider, ProviderError, RetryPolicy, SYSTEM_INSTRUCTION, SimulatedProvider,
    build_instruction, in_band_error, is_unconfigured_key,
};
use crate::state_machine::{MediaType, excerpt};

const VENDOR: &str = "OpenAI";

pub struct OpenAiClient {
    settings: OpenAiSettings,
    retry: RetryPolicy,
    client: Client,
    fallback: SimulatedProvider,
}

impl OpenAiClient {
    pub fn new(settings: OpenAiSettings, retry: RetryPolicy) -> Result<Self, ProviderError> {
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
        format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'))
    }

    /// One HTTP round trip. Rate limits come back as a retryable error; any
    /// other non-success status becomes an in-band error reply.
    async fn send_once(&self, req: &ChatCompletionRequest) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.settings.api_key)
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
            tracing::error!(status = status.as_u16(), body = %body, "OpenAI API error");
            return Ok(in_band_error(format!(
                "API {VENDOR} {} - {body}",
                status.as_u16()
            )));
        }

        let body = response.json::<ChatCompletionResponse>().await?;
        match body.first_content() {
            Some(text) => {
                tracing::info!(
                    total_tokens = body.usage.as_ref().map(|u| u.total_tokens),
                    "received prompt from OpenAI"
                );
                Ok(text.to_string())
            }
            None => {
                tracing::warn!("empty or malformed reply from OpenAI");
                Ok(in_band_error("empty or malformed reply from ChatGPT."))
            }
        }
    }
}

impl PromptProvider for OpenAiClient {
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

        let req = ChatCompletionRequest {
            model: self.settings.model.clone(),
            messages: vec![
                ChatMessage::system(SYSTEM_INSTRUCTION),
                ChatMessage::user(build_instruction(scenario, media_type)),
            ],
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };
        tracing::info!(
            model = %req.model,
            scenario = %excerpt(scenario, 50),
            "sending prompt request to OpenAI"
        );

        self.retry.run(VENDOR, || self.send_once(&req)).await
    }
}
