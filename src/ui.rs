//! Terminal output: a spinner for long-running commands and coloured
//! request listings.
//!
//! Uses `indicatif` for the spinner and `console` for styling. Statuses are
//! coloured by stage: green for `SUCCESS`, red for `FAIL`, cyan for the
//! in-progress states and plain for the rest.

use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::orchestrator::{BatchReport, CommandOutcome};
use crate::state_machine::{MediaRequest, RequestId, RequestStatus, excerpt};

/// Spinner shown while a command waits on a provider or the generator.
pub struct RequestProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
}

impl RequestProgress {
    pub fn start(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Clears the spinner and reports how a per-request command ended.
    pub fn finish(&self, command: &str, id: RequestId, outcome: &CommandOutcome) {
        self.pb.finish_and_clear();
        match outcome {
            CommandOutcome::Applied(record) if record.status == RequestStatus::Fail => {
                println!(
                    "  {} {command} #{id} failed: {}",
                    self.red.apply_to("✗"),
                    record.error_message.as_deref().unwrap_or("unknown error")
                );
            }
            CommandOutcome::Applied(record) => {
                println!(
                    "  {} {command} #{id}: {}",
                    self.green.apply_to("✓"),
                    status_style(record.status).apply_to(record.status)
                );
            }
            CommandOutcome::NotFound => {
                println!("  {} request #{id} not found", self.yellow.apply_to("?"));
            }
            CommandOutcome::InvalidTransition { current } => {
                println!(
                    "  {} cannot {command} request #{id} while it is {}",
                    self.yellow.apply_to("!"),
                    status_style(*current).apply_to(current)
                );
            }
        }
    }

    /// Clears the spinner and prints the batch tally.
    pub fn finish_batch(&self, report: &BatchReport) {
        self.pb.finish_and_clear();
        if report == &BatchReport::default() {
            println!("  {} nothing to process", self.yellow.apply_to("·"));
            return;
        }
        println!(
            "  {} {} processed: {} succeeded, {} failed",
            self.green.apply_to("✓"),
            report.processed,
            self.green.apply_to(report.succeeded),
            self.red.apply_to(report.failed)
        );
        if report.skipped > 0 || report.errored > 0 {
            println!(
                "  {} {} skipped, {} not recorded",
                self.yellow.apply_to("!"),
                report.skipped,
                report.errored
            );
        }
    }

    /// Clears the spinner without printing anything.
    pub fn abandon(&self) {
        self.pb.finish_and_clear();
    }
}

fn status_style(status: RequestStatus) -> Style {
    match status {
        RequestStatus::Success => Style::new().green().bold(),
        RequestStatus::Fail => Style::new().red().bold(),
        RequestStatus::FormattingPrompt | RequestStatus::Running => Style::new().cyan(),
        RequestStatus::Go | RequestStatus::PromptGenerated => Style::new().yellow(),
        RequestStatus::NotYet => Style::new(),
    }
}

/// One listing line: id, status, media type, platform and a scenario excerpt.
pub fn render_row(record: &MediaRequest) -> String {
    format!(
        "{:>5}  {:<18} {:<7} {:<10} {}",
        record.id,
        status_style(record.status).apply_to(record.status.to_string()),
        record.media_type.to_string(),
        record.target_platform.to_string(),
        record.scenario_excerpt(50)
    )
}

pub fn print_table(records: &[MediaRequest]) {
    if records.is_empty() {
        println!("No requests yet.");
        return;
    }
    let header = Style::new().bold();
    println!(
        "{}",
        header.apply_to(format!(
            "{:>5}  {:<18} {:<7} {:<10} {}",
            "ID", "STATUS", "TYPE", "PLATFORM", "SCENARIO"
        ))
    );
    for record in records {
        println!("{}", render_row(record));
    }
}

pub fn print_submitted(record: &MediaRequest) {
    println!(
        "  {} submitted request #{} ({})",
        Style::new().green().bold().apply_to("✓"),
        record.id,
        status_style(record.status).apply_to(record.status)
    );
}

/// Full detail view of one request.
pub fn print_record(record: &MediaRequest) {
    let label = Style::new().bold();
    let dim = Style::new().dim();
    let providers = if record.selected_providers.is_empty() {
        "-".to_string()
    } else {
        record
            .selected_providers
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    };

    println!("{} #{}", label.apply_to("Request"), record.id);
    println!("  status:     {}", status_style(record.status).apply_to(record.status));
    println!("  media:      {} for {}", record.media_type, record.target_platform);
    println!("  providers:  {providers}");
    println!("  created:    {}", record.created_at.to_rfc3339());
    println!("  updated:    {}", record.status_updated_at.to_rfc3339());
    println!("  scenario:   {}", record.scenario);
    match &record.formatted_prompt {
        Some(prompt) => println!("  prompt:     {}", excerpt(prompt, 200)),
        None => println!("  prompt:     {}", dim.apply_to("-")),
    }
    if let Some(path) = &record.generated_media_path {
        println!("  media path: {path}");
    }
    if let Some(error) = &record.error_message {
        println!("  error:      {}", Style::new().red().apply_to(error));
    }
}
