//! Field extraction engine and reveal protocols.

pub mod field;
pub mod record;
pub mod reveal;

pub use field::{FieldSpec, Locator, Normalize, Pick, Predicate};
pub use record::RecordExtractor;
pub use reveal::{RevealController, RevealOutcome, RevealStep};
