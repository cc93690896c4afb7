//! Indicator catalog and the sources it is loaded from.
//!
//! The catalog lists every indicator the downloader knows about, the default
//! form template they share, and the ordered region code sequence used by the
//! batch entry points. Callers fetch a fresh snapshot from a [`CatalogSource`]
//! at the start of each run, so edits to a catalog file are picked up between
//! batches without restarting the process.

mod model;
mod source;

// Re-export public API
pub use model::{Catalog, FieldValue, IndicatorDef, RawTemplate};
pub use source::{BundledCatalog, CatalogSource, FileCatalog, StaticCatalog};

pub(crate) use model::is_region_code;
