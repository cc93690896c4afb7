use super::BatchSummary;
use crate::models::Outcome;

/// Receives one call per download attempt.
///
/// Frontends implement this to surface progress; the batch driver never
/// prints on its own.
pub trait ProgressReporter {
    /// Called before the first attempt with the number of attempts planned.
    fn begin(&mut self, _total: usize) {}

    /// Called after every attempt.
    fn report(&mut self, region: &str, indicator: &str, outcome: &Outcome);

    /// Called once the batch is over.
    fn finish(&mut self, _summary: &BatchSummary) {}
}

/// A no-op reporter.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn report(&mut self, _region: &str, _indicator: &str, _outcome: &Outcome) {}
}
