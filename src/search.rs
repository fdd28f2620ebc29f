//! Keyword search on the catalog dashboard.

use crate::browser::{settle, Page, Target};
use crate::catalog::selectors::search;
use crate::catalog::LookupKey;
use crate::config::Waits;
use crate::error::CrawlError;
use std::time::Duration;
use tracing::{debug, info};

/// Whether a search produced result rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Number of result rows on the page.
    Found(usize),
    NotFound,
}

/// Types a key into the search box and waits for results.
pub struct SearchController<'a> {
    page: &'a dyn Page,
    waits: &'a Waits,
}

impl<'a> SearchController<'a> {
    pub fn new(page: &'a dyn Page, waits: &'a Waits) -> Self {
        Self { page, waits }
    }

    /// Runs one search. A result wait that times out is `NotFound`; anything
    /// else going wrong is an error.
    pub async fn search(&self, key: &LookupKey) -> Result<SearchOutcome, CrawlError> {
        let input = Target::css(search::INPUT);
        if self.page.count(&input).await? == 0 {
            return Err(CrawlError::SearchUnavailable(format!(
                "search input {} not found",
                search::INPUT
            )));
        }

        self.page.fill(&input, "").await?;
        settle(Duration::from_millis(self.waits.clear_pause_ms)).await;
        self.page.fill(&input, key.as_str()).await?;
        settle(Duration::from_millis(self.waits.type_pause_ms)).await;
        self.page.press_key(&input, "Enter").await?;
        debug!("Submitted search for {}", key);

        self.page.wait_for_network_idle(Duration::from_millis(self.waits.network_idle_ms)).await?;

        let row = Target::css(search::ROW);
        if !self.page.wait_for(&row, Duration::from_millis(self.waits.results_ms)).await? {
            info!("No results for {}", key);
            return Ok(SearchOutcome::NotFound);
        }

        let rows = self.page.count(&row).await?;
        info!("Found {} result row(s) for {}", rows, key);

        Ok(if rows == 0 { SearchOutcome::NotFound } else { SearchOutcome::Found(rows) })
    }
}
