//! Batch downloads over indicators and regions.
//!
//! The main entry point is [`BatchDriver`]; its collaborators (browser
//! sessions, catalog, output sink, progress reporter) are passed in as traits.

mod progress;
mod region_range;
mod runner;
mod sink;

use crate::models::Failure;
use std::time::Duration;

// Re-export public API
pub use progress::{NullReporter, ProgressReporter};
pub use region_range::{select_regions, validate_region_format};
pub use runner::BatchDriver;
pub use sink::{HtmlFileSink, OutputSink};

/// A pair whose download failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedPair {
    pub region: String,
    pub indicator: String,
    pub reason: Failure,
}

/// A region a range run could not start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRegion {
    pub region: String,
    pub error: String,
}

/// Tally of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: Vec<FailedPair>,
    /// Output keys whose table downloaded but could not be saved.
    pub write_errors: Vec<String>,
    /// Regions skipped whole by a range run.
    pub region_errors: Vec<FailedRegion>,
    pub elapsed: Duration,
}

impl BatchSummary {
    pub fn attempts(&self) -> usize {
        self.succeeded + self.skipped + self.failed.len()
    }

    pub fn merge(&mut self, other: BatchSummary) {
        self.succeeded += other.succeeded;
        self.skipped += other.skipped;
        self.failed.extend(other.failed);
        self.write_errors.extend(other.write_errors);
        self.region_errors.extend(other.region_errors);
        self.elapsed += other.elapsed;
    }
}
