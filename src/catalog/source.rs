use super::Catalog;
use crate::errors::{AppError, AppResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Provides catalog snapshots.
///
/// Implementations are asked for a fresh snapshot at the start of every
/// resolution or batch run.
pub trait CatalogSource {
    fn fetch(&self) -> AppResult<Catalog>;
}

impl<T: CatalogSource + ?Sized> CatalogSource for Box<T> {
    fn fetch(&self) -> AppResult<Catalog> {
        (**self).fetch()
    }
}

/// Catalog read from a TOML file on every fetch.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    path: PathBuf,
}

impl FileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogSource for FileCatalog {
    fn fetch(&self) -> AppResult<Catalog> {
        let contents = fs::read_to_string(&self.path).map_err(|e| {
            AppError::IoError(format!(
                "Failed to read catalog {}: {e}",
                self.path.display()
            ))
        })?;
        let catalog = Catalog::from_toml_str(&contents)?;
        debug!(
            catalog = %self.path.display(),
            indicators = catalog.indicators.len(),
            regions = catalog.region_codes.len(),
            "Catalog loaded"
        );
        Ok(catalog)
    }
}

/// The catalog compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledCatalog;

impl CatalogSource for BundledCatalog {
    fn fetch(&self) -> AppResult<Catalog> {
        Catalog::bundled()
    }
}

/// An in-memory catalog that never changes.
#[derive(Debug, Clone)]
pub struct StaticCatalog(pub Catalog);

impl CatalogSource for StaticCatalog {
    fn fetch(&self) -> AppResult<Catalog> {
        Ok(self.0.clone())
    }
}
