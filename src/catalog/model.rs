use crate::constants::{BUNDLED_CATALOG, REGION_CODE_PATTERN};
use crate::errors::{AppError, AppResult};
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

static REGION_CODE_REGEX: OnceLock<Regex> = OnceLock::new();

/// A template value as written in the catalog: a single string or a list of option labels.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    One(String),
    Many(Vec<String>),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::One(value.to_string())
    }
}

/// Field name to value mapping before resolution, possibly carrying the `available` key.
pub type RawTemplate = BTreeMap<String, FieldValue>;

/// One indicator entry of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndicatorDef {
    /// Numeric id; also the name attribute of the indicator checkbox.
    pub id: u32,
    /// Indicator-level overrides of the default template.
    #[serde(default)]
    pub template: RawTemplate,
    /// Region-level overrides keyed by OK2 code.
    #[serde(default)]
    pub regions: BTreeMap<String, RawTemplate>,
}

/// Immutable snapshot of the indicator catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Catalog {
    /// Ordered OK2 codes; defines batch iteration order and slice bounds.
    pub region_codes: Vec<String>,
    /// Global default template shared by every indicator.
    #[serde(default)]
    pub default_template: RawTemplate,
    pub indicators: BTreeMap<String, IndicatorDef>,
}

impl Catalog {
    /// Parses and validates a catalog from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the TOML is malformed, a region code is not two
    /// digits, the region sequence has duplicates, or an indicator overrides a
    /// region that is not in the sequence.
    pub fn from_toml_str(contents: &str) -> AppResult<Self> {
        let catalog: Catalog = toml::from_str(contents)
            .map_err(|e| AppError::CatalogError(format!("Failed to parse catalog: {e}")))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Parses the catalog shipped with the crate.
    pub fn bundled() -> AppResult<Self> {
        Self::from_toml_str(BUNDLED_CATALOG)
    }

    pub fn indicator(&self, name: &str) -> Option<&IndicatorDef> {
        self.indicators.get(name)
    }

    /// Indicator names in deterministic (sorted) order.
    pub fn indicator_names(&self) -> impl Iterator<Item = &str> {
        self.indicators.keys().map(String::as_str)
    }

    pub fn contains_region(&self, region: &str) -> bool {
        self.region_codes.iter().any(|code| code == region)
    }

    /// Position of a region in the sequence.
    pub fn region_index(&self, region: &str) -> Option<usize> {
        self.region_codes.iter().position(|code| code == region)
    }

    pub fn available_regions(&self) -> String {
        self.region_codes.join(", ")
    }

    fn validate(&self) -> AppResult<()> {
        if self.region_codes.is_empty() {
            return Err(AppError::CatalogError(
                "region_codes must not be empty".into(),
            ));
        }

        let mut seen = HashSet::with_capacity(self.region_codes.len());
        for code in &self.region_codes {
            if !is_region_code(code) {
                return Err(AppError::CatalogError(format!(
                    "Region code must be two digits, got: '{code}'"
                )));
            }
            if !seen.insert(code.as_str()) {
                return Err(AppError::CatalogError(format!(
                    "Duplicate region code: '{code}'"
                )));
            }
        }

        for (name, indicator) in &self.indicators {
            for region in indicator.regions.keys() {
                if !seen.contains(region.as_str()) {
                    return Err(AppError::CatalogError(format!(
                        "Indicator '{name}' overrides unknown region '{region}'"
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Returns true for two-digit OK2 codes such as `01`.
pub(crate) fn is_region_code(code: &str) -> bool {
    let regex = REGION_CODE_REGEX.get_or_init(|| {
        Regex::new(REGION_CODE_PATTERN).expect("REGION_CODE_PATTERN is a valid regex pattern")
    });
    regex.is_match(code)
}
