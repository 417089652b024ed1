//! `mediaflow` turns short scenarios into formatted prompts and generated
//! media, tracking every request through its lifecycle in a JSON store.
//!
//! # Environment variables
//!
//! | Variable         | Description                                   |
//! |------------------|-----------------------------------------------|
//! | `OPENAI_API_KEY` | Overrides `[openai].api_key`                  |
//! | `GEMINI_API_KEY` | Overrides `[gemini].api_key`                  |
//! | `RUST_LOG`       | Log filter, defaults to `mediaflow=info`      |

mod cli;
mod config;
mod error;
mod orchestrator;
mod provider;
mod state_machine;
mod store;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Command};
use config::MediaflowConfig;
use error::MediaflowError;
use orchestrator::{OrchestratorSettings, RequestOrchestrator, SimulatedGenerator, ThreadRandom};
use provider::{ConfiguredProvider, PromptProvider};
use state_machine::{NewMediaRequest, RequestId};
use store::ConfiguredStore;
use ui::RequestProgress;

type Orchestrator =
    RequestOrchestrator<ConfiguredStore, ConfiguredProvider, SimulatedGenerator<ThreadRandom>>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => MediaflowConfig::load_from(path)?,
        None => MediaflowConfig::load()?,
    };
    if let Some(provider) = cli.provider {
        config.provider.kind = provider.into();
    }

    let orchestrator = build(&config).await?;
    run(&orchestrator, cli.command).await
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "mediaflow=debug" } else { "mediaflow=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn build(config: &MediaflowConfig) -> Result<Orchestrator> {
    let store = ConfiguredStore::from_config(&config.store)
        .await
        .with_context(|| format!("failed to open request store {}", config.store.path))?;
    let provider = ConfiguredProvider::from_config(config).map_err(MediaflowError::from)?;
    let generator = SimulatedGenerator::new(ThreadRandom, &config.generation);
    let settings = OrchestratorSettings::from_config(config);
    tracing::debug!(
        provider = provider.name(),
        store = ?config.store.kind,
        path = %config.store.path,
        retry_from_fail = settings.policy.retries_from_fail(),
        batch_concurrency = settings.batch_concurrency,
        "orchestrator ready"
    );

    Ok(RequestOrchestrator::new(store, provider, generator, settings))
}

async fn run(orchestrator: &Orchestrator, command: Command) -> Result<()> {
    let target = command.request_id();
    match command {
        Command::Submit {
            scenario,
            media_type,
            platform,
            providers,
        } => {
            let draft = NewMediaRequest::new(
                scenario,
                NewMediaRequest::parse_providers(&providers),
                media_type.into(),
                platform.into(),
            )
            .map_err(MediaflowError::from)?;
            let record = orchestrator.submit(draft).await.map_err(MediaflowError::from)?;
            ui::print_submitted(&record);
        }
        Command::Approve { id } => {
            let id = RequestId(id);
            let outcome = orchestrator.approve(id).await.map_err(MediaflowError::from)?;
            RequestProgress::start("approving").finish("approve", id, &outcome);
        }
        Command::Format { id } => {
            let id = RequestId(id);
            let progress = RequestProgress::start(&format!(
                "formatting prompt for #{id} via {}",
                orchestrator.provider().name()
            ));
            match orchestrator.format_prompt(id).await {
                Ok(outcome) => progress.finish("format", id, &outcome),
                Err(err) => {
                    progress.abandon();
                    return Err(MediaflowError::from(err).into());
                }
            }
        }
        Command::Process => {
            let progress = RequestProgress::start("generating media for approved requests");
            match orchestrator.process_pending_batch().await {
                Ok(report) => progress.finish_batch(&report),
                Err(err) => {
                    progress.abandon();
                    return Err(MediaflowError::from(err).into());
                }
            }
        }
        Command::List { order } => {
            let records = orchestrator
                .list_requests(order.into())
                .await
                .map_err(MediaflowError::from)?;
            ui::print_table(&records);
        }
        Command::Show { id } => {
            let id = RequestId(id);
            let record = orchestrator
                .find(id)
                .await
                .map_err(MediaflowError::from)?
                .ok_or(MediaflowError::RequestNotFound(id))?;
            ui::print_record(&record);
        }
    }
    tracing::debug!(request_id = ?target, "command finished");
    Ok(())
}
