//! Work on saved raw tables.
//!
//! The protocol saves only the inner markup of the output table. These helpers
//! make saved tables viewable in a browser and give a quick count of data rows
//! per file, which is how a failed or empty download is spotted after a batch.

use crate::errors::{AppError, AppResult};
use crate::utils::split_output_key;
use scraper::{Html, Selector};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};
use walkdir::WalkDir;

const HTML_HEADER: &str = concat!(
    "<html><head><meta charset='UTF-8'></head><style>",
    "body {font-family: Arial, sans-serif;background-color: #eeeeee;}",
    ".bL0 {color: black; font-weight: bold;}",
    ".bL1 {color: gray; font-weight: normal; font-size: 8pt;}",
    ".bL2 {color: #006666; font-size: 10pt; padding-left: 20px;}",
    "</style><table>"
);
const HTML_FOOTER: &str = "</table></html>";

static ROW_SELECTOR: OnceLock<Selector> = OnceLock::new();
static CELL_SELECTOR: OnceLock<Selector> = OnceLock::new();

/// Data row count for one saved table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStats {
    pub region: String,
    pub indicator: String,
    pub data_points: usize,
}

/// Wraps a raw table fragment into a standalone HTML document.
pub fn format_html(raw: &str) -> String {
    format!("{HTML_HEADER}{raw}{HTML_FOOTER}")
}

pub fn is_formatted(html: &str) -> bool {
    html.starts_with(HTML_HEADER)
}

/// Counts table rows holding at least one numeric cell.
///
/// Decimal commas are accepted, so `"12,5"` counts as a number.
pub fn count_data_points(html: &str) -> usize {
    let rows = ROW_SELECTOR
        .get_or_init(|| Selector::parse("tr").expect("'tr' is a valid CSS selector"));
    let cells = CELL_SELECTOR
        .get_or_init(|| Selector::parse("td").expect("'td' is a valid CSS selector"));

    // Fragments of <tr> elements are dropped by the HTML parser outside a table.
    let document = if is_formatted(html) {
        Html::parse_document(html)
    } else {
        Html::parse_document(&format_html(html))
    };

    document
        .select(rows)
        .filter(|row| {
            row.select(cells).any(|cell| {
                let text = cell.text().collect::<String>();
                is_number(&text)
            })
        })
        .count()
}

fn is_number(text: &str) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty() && trimmed.replace(',', ".").parse::<f64>().is_ok()
}

/// Rewrites every raw `.html` table in `dir` as a standalone document.
///
/// Files that are already wrapped are left untouched. Returns the number of
/// files rewritten.
pub fn format_folder(dir: &Path) -> AppResult<usize> {
    let mut formatted = 0;
    for path in html_files(dir)? {
        let raw = fs::read_to_string(&path)?;
        if is_formatted(&raw) {
            debug!(file_path = %path.display(), "Already formatted, skipping");
            continue;
        }
        fs::write(&path, format_html(&raw))?;
        formatted += 1;
    }
    info!(dir = %dir.display(), formatted, "Folder formatted");
    Ok(formatted)
}

/// Data row counts for every `{region}_{indicator}.html` file in `dir`, sorted by file name.
pub fn folder_stats(dir: &Path) -> AppResult<Vec<TableStats>> {
    let mut stats = Vec::new();
    for path in html_files(dir)? {
        let Some((region, indicator)) = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(split_output_key)
        else {
            debug!(file_path = %path.display(), "Not a saved table, skipping");
            continue;
        };

        let html = fs::read_to_string(&path)?;
        stats.push(TableStats {
            region: region.to_string(),
            indicator: indicator.to_string(),
            data_points: count_data_points(&html),
        });
    }
    Ok(stats)
}

fn html_files(dir: &Path) -> AppResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(AppError::IoError(format!(
            "Directory does not exist: {}",
            dir.display()
        )));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("html"))
        .collect();
    files.sort();
    Ok(files)
}
