use crate::catalog::is_region_code;
use crate::errors::{AppError, AppResult};

/// Validates that a region code is a two-digit OK2 code.
///
/// Returns `Ok(())` if valid, or `InvalidInput` error otherwise.
pub fn validate_region_format(region: &str) -> AppResult<()> {
    if region.is_empty() {
        return Err(AppError::InvalidInput(
            "Region must be a two-digit OK2 code, got empty string".to_string(),
        ));
    }
    if !is_region_code(region) {
        return Err(AppError::InvalidInput(format!(
            "Region must be a two-digit OK2 code, got: {region}"
        )));
    }
    Ok(())
}

/// Selects the slice `[start, end]` (inclusive) of the region code sequence.
///
/// Missing bounds default to the first and last code of the sequence. Order
/// follows the sequence, not numeric order.
///
/// # Errors
///
/// Returns `InvalidInput` if a bound is not a two-digit code or `start` comes
/// after `end` in the sequence, and `UnknownRegion` if a bound is well formed
/// but not part of the sequence.
pub fn select_regions(
    region_codes: &[String],
    start: Option<&str>,
    end: Option<&str>,
) -> AppResult<Vec<String>> {
    let position = |bound: Option<&str>, default: usize| -> AppResult<usize> {
        match bound {
            None => Ok(default),
            Some(region) => {
                validate_region_format(region)?;
                region_codes
                    .iter()
                    .position(|code| code == region)
                    .ok_or_else(|| AppError::UnknownRegion {
                        region: region.to_string(),
                        available: region_codes.join(", "),
                    })
            }
        }
    };

    if region_codes.is_empty() {
        return Ok(Vec::new());
    }

    let start_idx = position(start, 0)?;
    let end_idx = position(end, region_codes.len() - 1)?;

    if start_idx > end_idx {
        return Err(AppError::InvalidInput(format!(
            "Start region '{}' must not come after end region '{}'",
            start.unwrap_or_default(),
            end.unwrap_or_default()
        )));
    }

    Ok(region_codes[start_idx..=end_idx].to_vec())
}
