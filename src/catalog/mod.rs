//! Edelweiss and Hachette catalogs: data models, selectors and snapshot parsing.

pub mod models;
pub mod parser;
pub mod selectors;

pub use models::{BatchResult, BookRecord, CatalogEntry, KeyKind, KeyResult, KeyStatus, LookupKey, Summary};
pub use parser::Parser;
