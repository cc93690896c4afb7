use crate::catalog::Catalog;
use crate::errors::{AppError, AppResult};
use crate::template::{resolve, Template};
use std::fmt;

/// Everything needed to download one indicator table for one region.
///
/// Built fresh per (indicator, region) pair and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub indicator_name: String,
    /// Numeric indicator id; the indicator checkbox carries it as its name.
    pub indicator_code: u32,
    /// OK2 region code.
    pub region: String,
    pub template: Template,
    pub available: bool,
}

impl Request {
    /// Resolves the template for the pair against a catalog snapshot.
    ///
    /// # Errors
    ///
    /// Returns `UnknownIndicator` or `UnknownRegion` when the pair is not in the catalog.
    pub fn create(catalog: &Catalog, indicator_name: &str, region: &str) -> AppResult<Self> {
        let resolved = resolve(catalog, indicator_name, region)?;
        let indicator_code = catalog
            .indicator(indicator_name)
            .map(|definition| definition.id)
            .ok_or_else(|| AppError::UnknownIndicator(indicator_name.to_string()))?;

        Ok(Self {
            indicator_name: indicator_name.to_string(),
            indicator_code,
            region: region.to_string(),
            template: resolved.template,
            available: resolved.available,
        })
    }

    /// Key used for saved payloads: `{region}_{indicator}`.
    pub fn output_key(&self) -> String {
        output_key(&self.region, &self.indicator_name)
    }
}

pub fn output_key(region: &str, indicator: &str) -> String {
    format!("{region}_{indicator}")
}

/// Steps of the form protocol, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    LoadRegion,
    OpenFolder,
    CheckIndicator,
    OpenForm,
    FillForm,
    ManualLayout,
    LaunchTable,
    ExtractTable,
}

impl Step {
    pub const ALL: [Step; 8] = [
        Step::LoadRegion,
        Step::OpenFolder,
        Step::CheckIndicator,
        Step::OpenForm,
        Step::FillForm,
        Step::ManualLayout,
        Step::LaunchTable,
        Step::ExtractTable,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::LoadRegion => "LoadRegion",
            Self::OpenFolder => "OpenFolder",
            Self::CheckIndicator => "CheckIndicator",
            Self::OpenForm => "OpenForm",
            Self::FillForm => "FillForm",
            Self::ManualLayout => "ManualLayout",
            Self::LaunchTable => "LaunchTable",
            Self::ExtractTable => "ExtractTable",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a download attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Failure {
    /// No browser session could be opened for the attempt.
    SessionNotStarted,
    RegionNotLoaded,
    FolderNotFound,
    IndicatorNotFound,
    FormNotLoaded,
    FormFillFailed,
    ManualLayoutFailed,
    /// The site answered the launch with a dialog instead of a table.
    AlertBlocked,
    LaunchFailed,
    ExtractFailed,
}

impl Failure {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionNotStarted => "SessionNotStarted",
            Self::RegionNotLoaded => "RegionNotLoaded",
            Self::FolderNotFound => "FolderNotFound",
            Self::IndicatorNotFound => "IndicatorNotFound",
            Self::FormNotLoaded => "FormNotLoaded",
            Self::FormFillFailed => "FormFillFailed",
            Self::ManualLayoutFailed => "ManualLayoutFailed",
            Self::AlertBlocked => "AlertBlocked",
            Self::LaunchFailed => "LaunchFailed",
            Self::ExtractFailed => "ExtractFailed",
        }
    }

    /// The protocol step that reports this failure, if any.
    pub fn step(&self) -> Option<Step> {
        match self {
            Self::SessionNotStarted => None,
            Self::RegionNotLoaded => Some(Step::LoadRegion),
            Self::FolderNotFound => Some(Step::OpenFolder),
            Self::IndicatorNotFound => Some(Step::CheckIndicator),
            Self::FormNotLoaded => Some(Step::OpenForm),
            Self::FormFillFailed => Some(Step::FillForm),
            Self::ManualLayoutFailed => Some(Step::ManualLayout),
            Self::AlertBlocked | Self::LaunchFailed => Some(Step::LaunchTable),
            Self::ExtractFailed => Some(Step::ExtractTable),
        }
    }

    /// Human-readable status line.
    pub fn message(&self) -> &'static str {
        match self {
            Self::SessionNotStarted => "Browser session not started",
            Self::RegionNotLoaded => "Region not loaded",
            Self::FolderNotFound => "Folder not found",
            Self::IndicatorNotFound => "Indicator not found",
            Self::FormNotLoaded => "Form not loaded",
            Self::FormFillFailed => "Form couldn't be filled out",
            Self::ManualLayoutFailed => "Manual layout failed",
            Self::AlertBlocked => "Alert prevented table from loading",
            Self::LaunchFailed => "Table not launched",
            Self::ExtractFailed => "Failed to extract table",
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one download attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Raw inner HTML of the output table.
    Success(String),
    /// The pair has no data; the page was never touched.
    Skipped,
    /// A step failed; `detail` carries the driver's error text.
    Failed { reason: Failure, detail: String },
}

impl Outcome {
    pub fn failed(reason: Failure, detail: impl fmt::Display) -> Self {
        Self::Failed {
            reason,
            detail: detail.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    pub fn failure(&self) -> Option<Failure> {
        match self {
            Self::Failed { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// Short status for logs and progress output.
    pub fn status(&self) -> &'static str {
        match self {
            Self::Success(_) => "Success!",
            Self::Skipped => "no data",
            Self::Failed { reason, .. } => reason.message(),
        }
    }
}
