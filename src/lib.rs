//! edel-crawler - Resilient book catalog extraction from Edelweiss
//!
//! Drives a headless Chrome through search, optional login and the UI
//! reveals that hide classification and summary data, writing results
//! incrementally so an interrupted batch keeps everything finished so far.
//! Hachette trade catalogs can be downloaded with a customer number.

pub mod browser;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod error;
pub mod extract;
pub mod format;
pub mod hachette;
pub mod pipeline;
pub mod search;
pub mod session;
pub mod writer;

pub use catalog::{BatchResult, BookRecord, CatalogEntry, KeyResult, KeyStatus, LookupKey, Summary};
pub use config::Config;
pub use error::CrawlError;
pub use writer::ResultWriter;
