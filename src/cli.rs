//! Command-line interface built on clap.
//!
//! [`Cli`] carries the global flags (`--config`, `--provider`, `--verbose`)
//! and one [`Command`] per orchestrator operation.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::ProviderKind;
use crate::state_machine::{MediaType, RequestId, TargetPlatform};
use crate::store::RecordOrder;

/// Mediaflow: turns scenarios into prompts and media, one lifecycle step at a time.
#[derive(Debug, Parser)]
#[command(name = "mediaflow", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the TOML config file (defaults to ./mediaflow.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Prompt provider to use for this run, overriding the config file.
    #[arg(long, global = true)]
    pub provider: Option<ProviderArg>,

    /// Enable debug logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderArg {
    /// Labelled placeholder prompts, no network.
    Simulated,
    /// OpenAI chat completions.
    #[value(alias = "chatgpt")]
    Openai,
    /// Google Gemini.
    Gemini,
}

impl From<ProviderArg> for ProviderKind {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Simulated => ProviderKind::Simulated,
            ProviderArg::Openai => ProviderKind::OpenAi,
            ProviderArg::Gemini => ProviderKind::Gemini,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MediaTypeArg {
    Images,
    Video,
    Comic,
}

impl From<MediaTypeArg> for MediaType {
    fn from(arg: MediaTypeArg) -> Self {
        match arg {
            MediaTypeArg::Images => MediaType::Images,
            MediaTypeArg::Video => MediaType::Video,
            MediaTypeArg::Comic => MediaType::Comic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlatformArg {
    Tiktok,
    Youtube,
    Instagram,
    Facebook,
    X,
}

impl From<PlatformArg> for TargetPlatform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Tiktok => TargetPlatform::Tiktok,
            PlatformArg::Youtube => TargetPlatform::Youtube,
            PlatformArg::Instagram => TargetPlatform::Instagram,
            PlatformArg::Facebook => TargetPlatform::Facebook,
            PlatformArg::X => TargetPlatform::X,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OrderArg {
    /// Newest submission first.
    Created,
    /// Most recent status change first.
    Updated,
}

impl From<OrderArg> for RecordOrder {
    fn from(arg: OrderArg) -> Self {
        match arg {
            OrderArg::Created => RecordOrder::CreationTime,
            OrderArg::Updated => RecordOrder::StatusUpdateTime,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Submit a new media request.
    Submit {
        /// What the media should show.
        scenario: String,

        #[arg(long, value_enum, default_value_t = MediaTypeArg::Video)]
        media_type: MediaTypeArg,

        #[arg(long, value_enum, default_value_t = PlatformArg::Tiktok)]
        platform: PlatformArg,

        /// Comma-separated provider names, e.g. "ChatGPT, Gemini".
        #[arg(long, default_value = "")]
        providers: String,
    },

    /// Approve a submitted request for processing.
    Approve { id: u64 },

    /// Format the request's scenario into a generation prompt.
    Format { id: u64 },

    /// Generate media for every approved request.
    Process,

    /// List all requests, newest first.
    List {
        #[arg(long, value_enum, default_value_t = OrderArg::Created)]
        order: OrderArg,
    },

    /// Show one request in full.
    Show { id: u64 },
}

impl Command {
    /// The request a per-request command targets.
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Command::Approve { id } | Command::Format { id } | Command::Show { id } => {
                Some(RequestId(*id))
            }
            _ => None,
        }
    }
}
