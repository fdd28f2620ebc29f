//! CLI command implementations.

pub mod batch;
pub mod catalog;
pub mod status;

pub use batch::BatchCommand;
pub use catalog::CatalogCommand;
pub use status::StatusCommand;
