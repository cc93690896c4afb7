//! census2010 library
//!
//! This crate provides the core functionality for the `census2010` binary,
//! which downloads 2010 census tables from the Rosstat municipal database by
//! driving a browser through the database's query form.
//!
//! ## Overview
//!
//! - [`catalog`] - Indicator catalog: region codes, default template and per-indicator overrides
//! - [`template`] - Merges the catalog layers into the template for one indicator and region
//! - [`models`] - Download requests, protocol steps and outcomes
//! - [`driver`] - Browser automation interface and its Chromium implementation
//! - [`protocol`] - The page interaction steps that turn a request into a table
//! - [`batch`] - Runs the protocol over regions and indicators and saves the tables
//! - [`post_process`] - Formatting and data row counts for saved tables
//! - [`cli`] - Command-line interface
//! - [`config`] - Runtime settings and TOML run files
//! - [`errors`] - Error types used throughout the application
//!
//! ## Example Usage
//!
//! ```no_run
//! use census2010::batch::{BatchDriver, HtmlFileSink, NullReporter};
//! use census2010::catalog::BundledCatalog;
//! use census2010::constants::MUNST_BASE_URL;
//! use census2010::driver::ChromiumFactory;
//! use census2010::errors::AppResult;
//!
//! # async fn example() -> AppResult<()> {
//! let sessions = ChromiumFactory::new(None, true, 5000);
//! let mut batch = BatchDriver::new(
//!     sessions,
//!     BundledCatalog,
//!     HtmlFileSink::new("data/html"),
//!     NullReporter,
//!     MUNST_BASE_URL,
//! );
//!
//! let summary = batch.download_region("01").await?;
//! println!("{} tables saved", summary.succeeded);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod constants;
pub mod driver;
pub mod errors;
pub mod models;
pub mod post_process;
pub mod protocol;
pub mod template;
pub mod ui;
pub mod utils;
