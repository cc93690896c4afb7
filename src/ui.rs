use crate::batch::{BatchSummary, ProgressReporter};
use crate::errors::{AppError, AppResult};
use crate::models::Outcome;
use crate::utils::format_duration;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

/// Creates a progress bar with the standard application styling.
///
/// # Arguments
///
/// * `total` - Total number of items to process
///
/// # Returns
///
/// Returns a configured `ProgressBar` ready for use, or an error if template creation fails.
///
/// # Example
///
/// ```no_run
/// use census2010::ui;
///
/// # fn main() -> Result<(), census2010::errors::AppError> {
/// let pb = ui::create_progress_bar(100)?;
/// pb.inc(1);
/// pb.finish_with_message("Done");
/// # Ok(())
/// # }
/// ```
pub fn create_progress_bar(total: u64) -> AppResult<ProgressBar> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}",
            )
            .map_err(|e| AppError::IoError(format!("Failed to create progress bar template: {e}")))?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Terminal reporter: a progress bar per batch plus one log event per attempt.
#[derive(Default)]
pub struct ConsoleReporter {
    pb: Option<ProgressBar>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressReporter for ConsoleReporter {
    fn begin(&mut self, total: usize) {
        self.pb = match create_progress_bar(total as u64) {
            Ok(pb) => Some(pb),
            Err(e) => {
                warn!(error = %e, "Progress bar unavailable");
                None
            }
        };
    }

    fn report(&mut self, region: &str, indicator: &str, outcome: &Outcome) {
        match outcome {
            Outcome::Success(markup) => {
                info!(region, indicator, bytes = markup.len(), "{}", outcome.status())
            }
            Outcome::Skipped => info!(region, indicator, "{}", outcome.status()),
            Outcome::Failed { reason, detail } => warn!(
                region,
                indicator,
                failure = reason.name(),
                detail = %detail,
                "{}",
                outcome.status()
            ),
        }

        if let Some(pb) = &self.pb {
            pb.set_message(format!("{region} - {indicator}"));
            pb.inc(1);
        }
    }

    fn finish(&mut self, summary: &BatchSummary) {
        let message = format!(
            "{} downloaded, {} skipped, {} failed",
            summary.succeeded,
            summary.skipped,
            summary.failed.len()
        );
        if let Some(pb) = self.pb.take() {
            pb.finish_with_message(message.clone());
        }
        info!(
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            failed = summary.failed.len(),
            write_errors = summary.write_errors.len(),
            elapsed = %format_duration(summary.elapsed),
            "{message}"
        );
    }
}
