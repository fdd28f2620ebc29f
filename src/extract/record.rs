//! Per-row record extraction: snapshot, parse, then reveal.

use crate::browser::{Page, Target};
use crate::catalog::selectors::search;
use crate::catalog::{BookRecord, Parser};
use crate::config::Waits;
use crate::extract::reveal::RevealController;
use tracing::{debug, warn};

/// Builds [`BookRecord`]s from the result rows of a search page.
pub struct RecordExtractor<'a> {
    page: &'a dyn Page,
    reveal: RevealController<'a>,
    parser: Parser,
    with_summary: bool,
}

impl<'a> RecordExtractor<'a> {
    /// `with_summary` enables the title panel reveal, which needs a
    /// logged-in session.
    pub fn new(page: &'a dyn Page, waits: &'a Waits, with_summary: bool) -> Self {
        Self { page, reveal: RevealController::new(page, waits), parser: Parser::new(), with_summary }
    }

    /// Extracts rows `0..rows` in DOM order.
    pub async fn extract_all(&self, rows: usize) -> Vec<BookRecord> {
        let mut records = Vec::with_capacity(rows);
        for row in 0..rows {
            records.push(self.extract(row).await);
        }
        records
    }

    /// Extracts one row. Never fails: unreadable rows yield an empty record
    /// and failed reveals leave their field empty.
    pub async fn extract(&self, row: usize) -> BookRecord {
        let snapshot = self.page.outer_html(&Target::css(search::ROW).nth(row)).await;

        let mut record = match snapshot {
            Ok(Some(html)) => self.parser.parse_row(&html),
            Ok(None) => {
                warn!("Row {} disappeared before it could be read", row);
                BookRecord::default()
            }
            Err(e) => {
                warn!("Failed to read row {}: {}", row, e);
                BookRecord::default()
            }
        };

        record.bisac = self.reveal.classification(row).await;

        if self.with_summary {
            record.summary = self.reveal.summary(row).await;
        }

        debug!(
            "Row {}: {} (bisac: {}, summary: {})",
            row,
            record.title.as_deref().unwrap_or("<untitled>"),
            record.bisac.len(),
            record.summary.is_some()
        );
        record
    }
}
