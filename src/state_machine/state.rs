use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a media request.
///
/// A request flows through: NOT_YET → GO → FORMATTING_PROMPT → PROMPT_GENERATED
/// → RUNNING → SUCCESS | FAIL. `FAIL` closes the stage that produced it, not
/// the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    NotYet,
    Go,
    FormattingPrompt,
    PromptGenerated,
    Running,
    Success,
    Fail,
}

#[cfg(test)]
impl RequestStatus {
    pub const ALL: [RequestStatus; 7] = [
        RequestStatus::NotYet,
        RequestStatus::Go,
        RequestStatus::FormattingPrompt,
        RequestStatus::PromptGenerated,
        RequestStatus::Running,
        RequestStatus::Success,
        RequestStatus::Fail,
    ];
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestStatus::NotYet => write!(f, "NOT_YET"),
            RequestStatus::Go => write!(f, "GO"),
            RequestStatus::FormattingPrompt => write!(f, "FORMATTING_PROMPT"),
            RequestStatus::PromptGenerated => write!(f, "PROMPT_GENERATED"),
            RequestStatus::Running => write!(f, "RUNNING"),
            RequestStatus::Success => write!(f, "SUCCESS"),
            RequestStatus::Fail => write!(f, "FAIL"),
        }
    }
}

/// A command that moves a request through the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Mark a freshly submitted request as ready for processing.
    Approve,
    /// Turn the scenario into a structured prompt via a prompt provider.
    FormatPrompt,
    /// Run the media generation stage (driven by the pending batch).
    Generate,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Approve => write!(f, "approve"),
            Command::FormatPrompt => write!(f, "format_prompt"),
            Command::Generate => write!(f, "generate"),
        }
    }
}

/// Pure legality rules for lifecycle transitions.
///
/// The default policy is strict: `format_prompt` is accepted only from
/// `NOT_YET`, `GO` and `PROMPT_GENERATED`. [`TransitionPolicy::with_fail_retry`]
/// additionally accepts `FAIL`, letting a failed formatting be retried
/// directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransitionPolicy {
    retry_from_fail: bool,
}

impl TransitionPolicy {
    pub fn strict() -> Self {
        Self {
            retry_from_fail: false,
        }
    }

    pub fn with_fail_retry() -> Self {
        Self {
            retry_from_fail: true,
        }
    }

    pub fn retries_from_fail(&self) -> bool {
        self.retry_from_fail
    }

    /// Whether `command` may start from `current`.
    pub fn allows(&self, current: RequestStatus, command: Command) -> bool {
        match command {
            Command::Approve => current == RequestStatus::NotYet,
            Command::FormatPrompt => match current {
                RequestStatus::NotYet | RequestStatus::Go | RequestStatus::PromptGenerated => true,
                RequestStatus::Fail => self.retry_from_fail,
                _ => false,
            },
            Command::Generate => current == RequestStatus::Go,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepted_sources(policy: TransitionPolicy, command: Command) -> Vec<RequestStatus> {
        RequestStatus::ALL
            .into_iter()
            .filter(|s| policy.allows(*s, command))
            .collect()
    }

    #[test]
    fn approve_only_from_not_yet() {
        assert_eq!(
            accepted_sources(TransitionPolicy::strict(), Command::Approve),
            vec![RequestStatus::NotYet]
        );
    }

    #[test]
    fn strict_format_prompt_sources() {
        assert_eq!(
            accepted_sources(TransitionPolicy::strict(), Command::FormatPrompt),
            vec![
                RequestStatus::NotYet,
                RequestStatus::Go,
                RequestStatus::PromptGenerated
            ]
        );
    }

    #[test]
    fn fail_retry_policy_also_accepts_fail() {
        let policy = TransitionPolicy::with_fail_retry();
        assert!(policy.allows(RequestStatus::Fail, Command::FormatPrompt));
        assert!(!policy.allows(RequestStatus::Running, Command::FormatPrompt));
        assert!(!policy.allows(RequestStatus::Success, Command::FormatPrompt));
        // Other commands are unaffected.
        assert!(!policy.allows(RequestStatus::Fail, Command::Approve));
        assert!(!policy.allows(RequestStatus::Fail, Command::Generate));
    }

    #[test]
    fn default_policy_is_strict() {
        assert_eq!(TransitionPolicy::default(), TransitionPolicy::strict());
        assert!(!TransitionPolicy::default().retries_from_fail());
    }

    #[test]
    fn generate_only_from_go() {
        assert_eq!(
            accepted_sources(TransitionPolicy::strict(), Command::Generate),
            vec![RequestStatus::Go]
        );
    }

    #[test]
    fn status_display() {
        assert_eq!(RequestStatus::NotYet.to_string(), "NOT_YET");
        assert_eq!(RequestStatus::FormattingPrompt.to_string(), "FORMATTING_PROMPT");
        assert_eq!(RequestStatus::PromptGenerated.to_string(), "PROMPT_GENERATED");
        assert_eq!(RequestStatus::Fail.to_string(), "FAIL");
    }

    #[test]
    fn status_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&RequestStatus::PromptGenerated).unwrap();
        assert_eq!(json, r#""PROMPT_GENERATED""#);
        let parsed: RequestStatus = serde_json::from_str(r#""NOT_YET""#).unwrap();
        assert_eq!(parsed, RequestStatus::NotYet);
    }
}
