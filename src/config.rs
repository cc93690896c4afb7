use crate::batch::validate_region_format;
use crate::constants::{MUNST_BASE_URL, REGION_PLACEHOLDER};
use crate::errors::{AppError, AppResult};
use crate::protocol::region_url;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Resolved settings with all values filled in (no Options except the catalog path).
///
/// This struct holds the runtime defaults and can be deserialized from the
/// `[settings]` table of a run file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolvedConfig {
    /// Chromium executable; looked up on the system when absent
    pub chrome_path: Option<PathBuf>,
    /// Run the browser without a window
    pub headless: bool,
    /// How long element lookups wait for an element to render, in milliseconds
    pub implicit_wait_ms: u64,
    /// Directory for saved `{region}_{indicator}.html` tables
    pub output_dir: PathBuf,
    /// Catalog TOML; the bundled catalog is used when absent
    pub catalog_path: Option<PathBuf>,
    /// Region page URL with a `{region}` placeholder
    pub base_url: String,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            implicit_wait_ms: 5000,
            output_dir: PathBuf::from("data/html"),
            catalog_path: None,
            base_url: MUNST_BASE_URL.to_string(),
        }
    }
}

impl ResolvedConfig {
    /// Checks values serde cannot check.
    pub fn validate(&self) -> AppResult<()> {
        if !self.base_url.contains(REGION_PLACEHOLDER) {
            return Err(AppError::InvalidInput(format!(
                "base_url must contain the {REGION_PLACEHOLDER} placeholder, got: {}",
                self.base_url
            )));
        }
        url::Url::parse(&region_url(&self.base_url, "01"))?;
        Ok(())
    }
}

/// What a run file asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// One indicator for one region
    Single,
    /// Every indicator for one region
    Region,
    /// One indicator over a region range
    Indicator,
    /// Every indicator over a region range
    Range,
    /// Every indicator from `start` to the last region
    All,
}

/// Run description loaded from a TOML file.
///
/// The parser rejects unknown keys to catch typos and checks that the keys
/// required by the chosen mode are present.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunFile {
    pub mode: RunMode,
    pub indicator: Option<String>,
    pub region: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    /// Runtime settings; defaults apply to anything left out
    #[serde(default)]
    pub settings: ResolvedConfig,
}

impl RunFile {
    /// Loads and validates a run file.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the TOML is malformed, unknown keys are
    /// present, a key required by the mode is missing, a region code is not
    /// two digits, or the settings are invalid.
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let contents = fs::read_to_string(path)?;
        let run: RunFile = toml::from_str(&contents)
            .map_err(|e| AppError::InvalidInput(format!("Failed to parse config: {e}")))?;
        run.validate()?;
        Ok(run)
    }

    fn validate(&self) -> AppResult<()> {
        let needs_indicator = matches!(self.mode, RunMode::Single | RunMode::Indicator);
        let needs_region = matches!(self.mode, RunMode::Single | RunMode::Region);

        if needs_indicator && self.indicator.is_none() {
            return Err(AppError::InvalidInput(format!(
                "Mode {:?} requires 'indicator'",
                self.mode
            )));
        }
        if needs_region && self.region.is_none() {
            return Err(AppError::InvalidInput(format!(
                "Mode {:?} requires 'region'",
                self.mode
            )));
        }

        for region in [&self.region, &self.start, &self.end].into_iter().flatten() {
            validate_region_format(region)?;
        }

        self.settings.validate()
    }
}
