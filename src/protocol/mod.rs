//! The form protocol: one download attempt for one (indicator, region) pair.
//!
//! Steps run strictly in order on a single page driver session:
//!
//! 1. LoadRegion - open the region's indicator page
//! 2. OpenFolder - expand the indicator's folder if it is collapsed
//! 3. CheckIndicator - tick the indicator checkbox
//! 4. OpenForm - show the field form
//! 5. FillForm - apply the request template
//! 6. ManualLayout - force the column order
//! 7. LaunchTable - submit, watching for a refusal dialog
//! 8. ExtractTable - read the table markup
//!
//! The site keeps state across navigation, so a failed step leaves the page
//! unusable: the attempt stops at the first failure and reports which step
//! failed. Callers start over with a fresh session.

mod primitives;
mod steps;

use crate::constants::REGION_PLACEHOLDER;
use crate::driver::PageDriver;
use crate::models::{Failure, Outcome, Request};
use steps::{StepContext, StepError};
use tracing::debug;

// Re-export public API
pub use primitives::{ensure_checked, select_options};

/// Runs the protocol for `request` and classifies the result.
///
/// Unavailable requests return [`Outcome::Skipped`] without any driver call.
/// Step errors never escape: they become [`Outcome::Failed`] carrying the
/// failing step's signal.
///
/// # Example
///
/// ```no_run
/// use census2010::catalog::Catalog;
/// use census2010::driver::{ChromiumFactory, SessionFactory};
/// use census2010::models::Request;
/// use census2010::protocol;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let catalog = Catalog::bundled()?;
/// let request = Request::create(&catalog, "street_network", "01")?;
/// let factory = ChromiumFactory::new(None, true, 5000);
/// let mut session = factory.open().await?;
/// let outcome = protocol::download(&mut session, &request, census2010::constants::MUNST_BASE_URL).await;
/// println!("{}", outcome.status());
/// # Ok(())
/// # }
/// ```
pub async fn download<D: PageDriver>(driver: &mut D, request: &Request, base_url: &str) -> Outcome {
    if !request.available {
        return Outcome::Skipped;
    }

    match run_steps(driver, request, base_url).await {
        Ok(markup) => Outcome::Success(markup),
        Err(StepError { reason, source }) => {
            debug!(
                region = %request.region,
                indicator = %request.indicator_name,
                failure = reason.name(),
                error = %source,
                "Download step failed"
            );
            Outcome::failed(reason, source)
        }
    }
}

async fn run_steps<D: PageDriver>(
    driver: &mut D,
    request: &Request,
    base_url: &str,
) -> Result<String, StepError> {
    steps::load_region(driver, request, base_url)
        .await
        .at(Failure::RegionNotLoaded)?;
    steps::open_folder(driver, request)
        .await
        .at(Failure::FolderNotFound)?;
    steps::check_indicator(driver, request)
        .await
        .at(Failure::IndicatorNotFound)?;
    steps::open_form(driver).await.at(Failure::FormNotLoaded)?;
    steps::fill_form(driver, request)
        .await
        .at(Failure::FormFillFailed)?;
    steps::manual_layout(driver, request)
        .await
        .at(Failure::ManualLayoutFailed)?;
    steps::launch_table(driver).await?;
    steps::extract_table(driver)
        .await
        .at(Failure::ExtractFailed)
}

/// Page URL for a region: `{region}` in `base_url` replaced by the OK2 code.
pub fn region_url(base_url: &str, region: &str) -> String {
    base_url.replace(REGION_PLACEHOLDER, region)
}
