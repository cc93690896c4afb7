use super::primitives::{ensure_checked, select_options};
use super::region_url;
use crate::constants::{
    CHECKBOX_SUFFIX, COLUMN_ORDER_PREFIX, FIXED_COLUMN_ORDER, FOLDER_CLASS, FORM_BUTTON_ID,
    LAUNCH_BUTTON_NAME, MANUAL_LAYOUT_ID, MANUAL_ORDER_PREFIX, MAX_FOLDER_DEPTH,
    OUTPUT_TABLE_CLASS,
};
use crate::driver::{DriverError, DriverResult, ElementRef, Locator, PageDriver};
use crate::models::{Failure, Request};
use crate::template::TemplateValue;
use tracing::debug;

/// A step failure: the signal to report and the driver error behind it.
#[derive(Debug)]
pub(crate) struct StepError {
    pub reason: Failure,
    pub source: DriverError,
}

pub(crate) trait StepContext<T> {
    fn at(self, reason: Failure) -> Result<T, StepError>;
}

impl<T> StepContext<T> for DriverResult<T> {
    fn at(self, reason: Failure) -> Result<T, StepError> {
        self.map_err(|source| StepError { reason, source })
    }
}

/// Opens the page listing every indicator of the region.
pub(crate) async fn load_region<D: PageDriver>(
    driver: &mut D,
    request: &Request,
    base_url: &str,
) -> DriverResult<()> {
    driver.navigate(&region_url(base_url, &request.region)).await
}

/// Expands the folder holding the indicator checkbox when the checkbox is hidden.
///
/// The folder is the nearest ancestor with class `list`; its toggle is the
/// element whose id is the folder id without its last character.
pub(crate) async fn open_folder<D: PageDriver>(
    driver: &mut D,
    request: &Request,
) -> DriverResult<()> {
    let code = request.indicator_code.to_string();
    let checkbox = driver.find_element(&Locator::name(code.as_str())).await?;
    if driver.is_displayed(&checkbox).await? {
        return Ok(());
    }

    let mut element = checkbox;
    for _ in 0..MAX_FOLDER_DEPTH {
        element = driver.find_child(&element, &Locator::parent()).await?;
        if driver.attribute(&element, "class").await?.as_deref() != Some(FOLDER_CLASS) {
            continue;
        }

        let list_id = driver.attribute(&element, "id").await?.unwrap_or_default();
        let mut chars = list_id.chars();
        chars.next_back();
        let folder_id = chars.as_str();
        if folder_id.is_empty() {
            return Err(DriverError::NoSuchElement(format!(
                "folder list for indicator {code} has no usable id"
            )));
        }
        let toggle = driver.find_element(&Locator::id(folder_id)).await?;
        return driver.click(&toggle).await;
    }

    Err(DriverError::NoSuchElement(format!(
        "no '{FOLDER_CLASS}' ancestor for indicator {code}"
    )))
}

pub(crate) async fn check_indicator<D: PageDriver>(
    driver: &mut D,
    request: &Request,
) -> DriverResult<()> {
    let checkbox = driver
        .find_element(&Locator::name(request.indicator_code.to_string()))
        .await?;
    ensure_checked(driver, &checkbox, true).await?;
    Ok(())
}

pub(crate) async fn open_form<D: PageDriver>(driver: &mut D) -> DriverResult<()> {
    let button = driver.find_element(&Locator::id(FORM_BUTTON_ID)).await?;
    driver.click(&button).await
}

/// Applies every template value to the form.
pub(crate) async fn fill_form<D: PageDriver>(driver: &mut D, request: &Request) -> DriverResult<()> {
    for (field, value) in request.template.iter() {
        match value {
            TemplateValue::Wildcard => {
                let checkbox = driver
                    .find_element(&Locator::name(format!("{field}{CHECKBOX_SUFFIX}")))
                    .await?;
                ensure_checked(driver, &checkbox, true).await?;
            }
            TemplateValue::Options(labels) => {
                let select = driver.find_element(&Locator::name(field)).await?;
                select_options(driver, &select, labels).await?;
            }
        }
    }
    Ok(())
}

/// Switches the form to manual column order.
///
/// Every templated field gets its second order control activated, then the
/// region breakdown, settlement type and geocode columns are forced to
/// positions 1, 2 and 3.
pub(crate) async fn manual_layout<D: PageDriver>(
    driver: &mut D,
    request: &Request,
) -> DriverResult<()> {
    let manual = nth_element(driver, &Locator::id(MANUAL_LAYOUT_ID), 0).await?;
    driver.click(&manual).await?;

    for field in request.template.fields() {
        let locator = Locator::name(format!("{MANUAL_ORDER_PREFIX}{field}"));
        let control = nth_element(driver, &locator, 1).await?;
        driver.click(&control).await?;
    }

    for (field, _) in FIXED_COLUMN_ORDER {
        let locator = Locator::name(format!("{MANUAL_ORDER_PREFIX}{field}"));
        let control = nth_element(driver, &locator, 2).await?;
        driver.click(&control).await?;
    }

    for (field, position) in FIXED_COLUMN_ORDER {
        let select = driver
            .find_element(&Locator::name(format!("{COLUMN_ORDER_PREFIX}{field}")))
            .await?;
        select_options(driver, &select, &[position]).await?;
    }

    Ok(())
}

/// Submits the form and focuses the window holding the table.
///
/// A dialog after submission means the site refused the request; it is
/// dismissed and reported as `AlertBlocked`.
pub(crate) async fn launch_table<D: PageDriver>(driver: &mut D) -> Result<(), StepError> {
    let button = driver
        .find_element(&Locator::name(LAUNCH_BUTTON_NAME))
        .await
        .at(Failure::LaunchFailed)?;

    match driver.click(&button).await {
        Ok(()) => {}
        Err(DriverError::UnexpectedAlert(text)) => {
            if let Err(e) = driver.dismiss_alert().await {
                debug!(error = %e, "Failed to dismiss alert");
            }
            return Err(DriverError::UnexpectedAlert(text)).at(Failure::AlertBlocked);
        }
        Err(e) => return Err(e).at(Failure::LaunchFailed),
    }

    if let Some(text) = driver.dismiss_alert().await.at(Failure::LaunchFailed)? {
        return Err(DriverError::UnexpectedAlert(text)).at(Failure::AlertBlocked);
    }

    driver
        .switch_to_last_window()
        .await
        .at(Failure::LaunchFailed)
}

/// Reads the raw markup of the output table.
pub(crate) async fn extract_table<D: PageDriver>(driver: &mut D) -> DriverResult<String> {
    let table = driver
        .find_element(&Locator::class_name(OUTPUT_TABLE_CLASS))
        .await?;
    driver
        .attribute(&table, "innerHTML")
        .await?
        .ok_or_else(|| DriverError::Protocol("output table has no innerHTML".into()))
}

async fn nth_element<D: PageDriver>(
    driver: &mut D,
    locator: &Locator,
    index: usize,
) -> DriverResult<ElementRef> {
    driver
        .find_elements(locator)
        .await?
        .into_iter()
        .nth(index)
        .ok_or_else(|| DriverError::NoSuchElement(format!("{locator}[{index}]")))
}
