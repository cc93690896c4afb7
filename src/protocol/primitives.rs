use crate::driver::{DriverResult, ElementRef, Locator, PageDriver};
use tracing::warn;

/// Brings a checkbox to the desired state.
///
/// Clicking a checkbox toggles it, so the current state is read first and the
/// control is clicked only when it disagrees. Returns whether a click was made.
pub async fn ensure_checked<D: PageDriver>(
    driver: &mut D,
    element: &ElementRef,
    desired: bool,
) -> DriverResult<bool> {
    if driver.is_selected(element).await? == desired {
        return Ok(false);
    }
    driver.click(element).await?;
    Ok(true)
}

/// Makes the selected options of a `select` element exactly `desired`.
///
/// Every option whose label is desired but unselected, or selected but not
/// desired, is clicked once. Returns the number of clicks made.
pub async fn select_options<D, S>(
    driver: &mut D,
    select: &ElementRef,
    desired: &[S],
) -> DriverResult<usize>
where
    D: PageDriver,
    S: AsRef<str>,
{
    let options = driver
        .find_children(select, &Locator::tag_name("option"))
        .await?;

    let mut toggles = 0;
    let mut matched = vec![false; desired.len()];
    for option in &options {
        let label = driver.text(option).await?;
        let wanted = match desired.iter().position(|d| d.as_ref() == label) {
            Some(index) => {
                matched[index] = true;
                true
            }
            None => false,
        };
        if wanted != driver.is_selected(option).await? {
            driver.click(option).await?;
            toggles += 1;
        }
    }

    for (label, found) in desired.iter().zip(matched) {
        if !found {
            warn!(option = label.as_ref(), "Requested option not present in select");
        }
    }

    Ok(toggles)
}
