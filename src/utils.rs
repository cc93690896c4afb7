use std::time::Duration;

pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Splits a saved table file stem `{region}_{indicator}` into its parts.
pub fn split_output_key(stem: &str) -> Option<(&str, &str)> {
    let (region, indicator) = stem.split_once('_')?;
    if region.is_empty() || indicator.is_empty() {
        return None;
    }
    Some((region, indicator))
}
