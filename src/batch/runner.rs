use super::region_range::{select_regions, validate_region_format};
use super::{BatchSummary, FailedPair, FailedRegion, OutputSink, ProgressReporter};
use crate::catalog::{Catalog, CatalogSource};
use crate::driver::{PageDriver, SessionFactory};
use crate::errors::{AppError, AppResult};
use crate::models::{Failure, Outcome, Request};
use crate::protocol;
use std::time::Instant;
use tracing::{info, warn};

/// Runs the form protocol over indicator and region selections.
///
/// Every attempt gets its own browser session, closed before the next
/// attempt starts whatever the outcome. Failed attempts are recorded and the
/// batch moves on. A catalog snapshot is fetched at the start of each run, and
/// per region in range runs.
pub struct BatchDriver<F, C, O, R> {
    sessions: F,
    catalog: C,
    sink: O,
    reporter: R,
    base_url: String,
}

impl<F, C, O, R> BatchDriver<F, C, O, R>
where
    F: SessionFactory,
    C: CatalogSource,
    O: OutputSink,
    R: ProgressReporter,
{
    pub fn new(sessions: F, catalog: C, sink: O, reporter: R, base_url: impl Into<String>) -> Self {
        Self {
            sessions,
            catalog,
            sink,
            reporter,
            base_url: base_url.into(),
        }
    }

    pub fn sink(&self) -> &O {
        &self.sink
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn sessions(&self) -> &F {
        &self.sessions
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Downloads one indicator for one region.
    ///
    /// # Errors
    ///
    /// Returns `UnknownIndicator` / `UnknownRegion` if the pair is not in the
    /// catalog. Download failures are reported through the returned outcome.
    pub async fn download_single(&mut self, indicator: &str, region: &str) -> AppResult<Outcome> {
        let catalog = self.catalog.fetch()?;
        let request = Request::create(&catalog, indicator, region)?;

        let started = Instant::now();
        self.reporter.begin(1);
        let mut summary = BatchSummary::default();
        let outcome = self.attempt(&request).await;
        self.record(&request, &outcome, &mut summary).await;
        summary.elapsed = started.elapsed();
        self.reporter.finish(&summary);

        Ok(outcome)
    }

    /// Downloads every catalog indicator for one region.
    pub async fn download_region(&mut self, region: &str) -> AppResult<BatchSummary> {
        let catalog = self.catalog.fetch()?;
        self.run_region(&catalog, region).await
    }

    async fn run_region(&mut self, catalog: &Catalog, region: &str) -> AppResult<BatchSummary> {
        validate_region_format(region)?;
        if !catalog.contains_region(region) {
            return Err(AppError::UnknownRegion {
                region: region.to_string(),
                available: catalog.available_regions(),
            });
        }

        let pairs: Vec<(String, String)> = catalog
            .indicator_names()
            .map(|indicator| (region.to_string(), indicator.to_string()))
            .collect();

        info!(region, indicators = pairs.len(), "Starting region download");
        self.run_pairs(catalog, &pairs).await
    }

    /// Downloads one indicator for every region in `[start, end]`.
    pub async fn download_indicator(
        &mut self,
        indicator: &str,
        start: Option<&str>,
        end: Option<&str>,
    ) -> AppResult<BatchSummary> {
        let catalog = self.catalog.fetch()?;
        if catalog.indicator(indicator).is_none() {
            return Err(AppError::UnknownIndicator(indicator.to_string()));
        }
        let regions = select_regions(&catalog.region_codes, start, end)?;

        let pairs: Vec<(String, String)> = regions
            .into_iter()
            .map(|region| (region, indicator.to_string()))
            .collect();

        info!(indicator, regions = pairs.len(), "Starting indicator download");
        self.run_pairs(&catalog, &pairs).await
    }

    /// Downloads every indicator for every region in `[start, end]`.
    ///
    /// Regions run one after another; the catalog is fetched again for each
    /// region so edits made during a long run apply to the remaining regions.
    /// A failed fetch falls back to the last catalog that loaded. A region that
    /// cannot run, for example because it was removed from the catalog, is
    /// recorded in `region_errors` and the run moves on.
    pub async fn download_range(
        &mut self,
        start: Option<&str>,
        end: Option<&str>,
    ) -> AppResult<BatchSummary> {
        let mut snapshot = self.catalog.fetch()?;
        let regions = select_regions(&snapshot.region_codes, start, end)?;

        info!(
            regions = regions.len(),
            start = start.unwrap_or("first"),
            end = end.unwrap_or("last"),
            "Starting range download"
        );

        let mut summary = BatchSummary::default();
        for region in &regions {
            match self.catalog.fetch() {
                Ok(catalog) => snapshot = catalog,
                Err(e) => warn!(
                    region = %region,
                    error = %e,
                    "Failed to reload catalog, using the last loaded one"
                ),
            }

            match self.run_region(&snapshot, region).await {
                Ok(region_summary) => summary.merge(region_summary),
                Err(e) => {
                    warn!(region = %region, error = %e, "Skipping region");
                    summary.region_errors.push(FailedRegion {
                        region: region.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(summary)
    }

    /// Downloads every indicator for every region from `start` to the end of the sequence.
    pub async fn download_all(&mut self, start: Option<&str>) -> AppResult<BatchSummary> {
        self.download_range(start, None).await
    }

    async fn run_pairs(
        &mut self,
        catalog: &Catalog,
        pairs: &[(String, String)],
    ) -> AppResult<BatchSummary> {
        let started = Instant::now();
        self.reporter.begin(pairs.len());

        let mut summary = BatchSummary::default();
        for (region, indicator) in pairs {
            let request = Request::create(catalog, indicator, region)?;
            let outcome = self.attempt(&request).await;
            self.record(&request, &outcome, &mut summary).await;
        }

        summary.elapsed = started.elapsed();
        self.reporter.finish(&summary);
        Ok(summary)
    }

    /// One protocol run on a fresh session.
    async fn attempt(&mut self, request: &Request) -> Outcome {
        if !request.available {
            return Outcome::Skipped;
        }

        let mut driver = match self.sessions.open().await {
            Ok(driver) => driver,
            Err(e) => {
                warn!(error = %e, "Failed to open browser session");
                return Outcome::failed(Failure::SessionNotStarted, e);
            }
        };

        let outcome = protocol::download(&mut driver, request, &self.base_url).await;

        if let Err(e) = driver.quit().await {
            warn!(
                region = %request.region,
                indicator = %request.indicator_name,
                error = %e,
                "Failed to close browser session"
            );
        }

        outcome
    }

    async fn record(&mut self, request: &Request, outcome: &Outcome, summary: &mut BatchSummary) {
        match outcome {
            Outcome::Success(markup) => {
                summary.succeeded += 1;
                let key = request.output_key();
                if let Err(e) = self.sink.write(&key, markup).await {
                    warn!(key = %key, error = %e, "Failed to save table");
                    summary.write_errors.push(key);
                }
            }
            Outcome::Skipped => summary.skipped += 1,
            Outcome::Failed { reason, .. } => summary.failed.push(FailedPair {
                region: request.region.clone(),
                indicator: request.indicator_name.clone(),
                reason: *reason,
            }),
        }

        self.reporter
            .report(&request.region, &request.indicator_name, outcome);
    }
}
