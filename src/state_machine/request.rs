use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::RequestStatus;
use crate::error::ValidationError;

/// Store-assigned identifier of a media request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Kind of media the request should eventually produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaType {
    Images,
    Video,
    Comic,
}

impl MediaType {
    /// Lower-case label used in provider instructions.
    pub fn label(&self) -> &'static str {
        match self {
            MediaType::Images => "images",
            MediaType::Video => "video",
            MediaType::Comic => "comic",
        }
    }

    /// File extension of a generated artifact of this type.
    pub fn extension(&self) -> &'static str {
        match self {
            MediaType::Images => "png",
            MediaType::Video => "mp4",
            MediaType::Comic => "pdf",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::Images => write!(f, "IMAGES"),
            MediaType::Video => write!(f, "VIDEO"),
            MediaType::Comic => write!(f, "COMIC"),
        }
    }
}

/// Platform the generated media is published to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetPlatform {
    Tiktok,
    Youtube,
    Instagram,
    Facebook,
    X,
}

impl fmt::Display for TargetPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetPlatform::Tiktok => write!(f, "TIKTOK"),
            TargetPlatform::Youtube => write!(f, "YOUTUBE"),
            TargetPlatform::Instagram => write!(f, "INSTAGRAM"),
            TargetPlatform::Facebook => write!(f, "FACEBOOK"),
            TargetPlatform::X => write!(f, "X"),
        }
    }
}

/// A validated submission, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMediaRequest {
    scenario: String,
    selected_providers: BTreeSet<String>,
    media_type: MediaType,
    target_platform: TargetPlatform,
}

impl NewMediaRequest {
    /// Builds a draft, rejecting blank scenarios. Provider names are trimmed
    /// and blanks dropped.
    pub fn new<I, S>(
        scenario: impl Into<String>,
        selected_providers: I,
        media_type: MediaType,
        target_platform: TargetPlatform,
    ) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let scenario = scenario.into();
        if scenario.trim().is_empty() {
            return Err(ValidationError::EmptyScenario);
        }
        let selected_providers = selected_providers
            .into_iter()
            .map(|p| p.as_ref().trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        Ok(Self {
            scenario,
            selected_providers,
            media_type,
            target_platform,
        })
    }

    /// Parses a comma-separated provider list such as `"ChatGPT, Gemini"`.
    pub fn parse_providers(list: &str) -> BTreeSet<String> {
        list.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Materialises the draft into a `NOT_YET` record. Called by stores once
    /// they have picked an id and a timestamp.
    pub fn into_record(self, id: RequestId, now: DateTime<Utc>) -> MediaRequest {
        MediaRequest {
            id,
            scenario: self.scenario,
            media_type: self.media_type,
            target_platform: self.target_platform,
            selected_providers: self.selected_providers,
            status: RequestStatus::NotYet,
            created_at: now,
            status_updated_at: now,
            formatted_prompt: None,
            generated_media_path: None,
            error_message: None,
        }
    }
}

/// The unit of work tracked through the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRequest {
    pub id: RequestId,
    pub scenario: String,
    pub media_type: MediaType,
    pub target_platform: TargetPlatform,
    #[serde(default)]
    pub selected_providers: BTreeSet<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub status_updated_at: DateTime<Utc>,
    pub formatted_prompt: Option<String>,
    pub generated_media_path: Option<String>,
    pub error_message: Option<String>,
}

impl MediaRequest {
    /// Enters a stage: sets the in-progress status and clears the last error.
    pub fn begin_stage(&mut self, status: RequestStatus) {
        self.status = status;
        self.error_message = None;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = RequestStatus::Fail;
        self.error_message = Some(message.into());
    }

    pub fn complete_formatting(&mut self, prompt: String) {
        self.formatted_prompt = Some(prompt);
        self.status = RequestStatus::PromptGenerated;
        self.error_message = None;
    }

    pub fn complete_generation(&mut self, media_path: String) {
        self.generated_media_path = Some(media_path);
        self.status = RequestStatus::Success;
        self.error_message = None;
    }

    /// First `max` characters of the scenario, for log lines.
    pub fn scenario_excerpt(&self, max: usize) -> String {
        excerpt(&self.scenario, max)
    }
}

/// Truncates `text` to `max` characters, appending an ellipsis when cut.
pub fn excerpt(text: &str, max: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
