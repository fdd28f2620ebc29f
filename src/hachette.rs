//! Hachette trade catalog download.
//!
//! Logs in with a customer number, follows the catalog link named by the
//! query (e.g. `January 2026 HNZ`) and reads every priced title off the
//! listing. The catalog code is the last word of the query and must show up
//! in the page address or title before anything is parsed.

use crate::browser::{settle, Browser, ClickMethod, Page, Target, POLL_INTERVAL};
use crate::catalog::selectors::hachette;
use crate::catalog::{CatalogEntry, Parser};
use crate::config::Config;
use crate::error::CrawlError;
use crate::session::{Readiness, Session};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Downloads the catalog named by `query`. The session is always released.
pub async fn fetch_catalog(
    browser: &dyn Browser,
    config: &Config,
    query: &str,
) -> Result<Vec<CatalogEntry>, CrawlError> {
    let query = query.trim();
    let Some(code) = catalog_code(query) else {
        return Err(CrawlError::CatalogUnavailable("empty catalog query".to_string()));
    };
    let Some(customer) = config.hachette.customer() else {
        return Err(CrawlError::LoginFailed("no Hachette customer number configured".to_string()));
    };

    let mut session = Session::open(browser).await?;
    let result = download(&mut session, config, customer, query, code).await;
    session.close().await;
    result
}

async fn download(
    session: &mut Session,
    config: &Config,
    customer: &str,
    query: &str,
    code: &str,
) -> Result<Vec<CatalogEntry>, CrawlError> {
    let waits = &config.waits;
    session.navigate_to(&config.hachette.login_url, waits).await?;

    if session.establish_with_customer(customer, waits).await? == Readiness::LoginFailed {
        return Err(CrawlError::LoginFailed(config.hachette.login_url.clone()));
    }

    let page = session.page();
    let link = Target::css(hachette::LINK).with_text(query);
    if page.count(&link).await? == 0 {
        let links = page.texts(hachette::LINK, true).await?;
        debug!("{} links on the catalog index", links.len());
        return Err(CrawlError::CatalogUnavailable(format!("no link for {}", query)));
    }

    info!("Opening catalog {}", query);
    page.click(&link, ClickMethod::Direct).await?;
    page.wait_for_network_idle(Duration::from_millis(waits.network_idle_ms)).await?;
    settle(Duration::from_millis(waits.load_settle_ms)).await;

    if !wait_for_catalog(page, code, Duration::from_millis(waits.catalog_ms)).await? {
        warn!("Not on the {} catalog page, skipping extraction", code);
        return Err(CrawlError::CatalogUnavailable(format!("{} page did not load", code)));
    }

    let html = page
        .outer_html(&Target::css("body"))
        .await?
        .ok_or_else(|| CrawlError::CatalogUnavailable(format!("{} page is empty", code)))?;

    let entries = Parser::new().parse_catalog(&html);
    info!("Found {} titles in {}", entries.len(), query);
    Ok(entries)
}

/// Catalog code: the last word of the query.
fn catalog_code(query: &str) -> Option<&str> {
    query.split_whitespace().last()
}

/// Polls until the page address or document title mentions `code`.
async fn wait_for_catalog(
    page: &dyn Page,
    code: &str,
    timeout: Duration,
) -> crate::browser::Result<bool> {
    let deadline = Instant::now() + timeout;
    loop {
        if page.url().await?.contains(code) {
            return Ok(true);
        }
        if page.texts(hachette::DOCUMENT_TITLE, false).await?.iter().any(|t| t.contains(code)) {
            return Ok(true);
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(false);
        }
        tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_code() {
        assert_eq!(catalog_code("January 2026 HNZ"), Some("HNZ"));
        assert_eq!(catalog_code("  December 2025 HCB "), Some("HCB"));
        assert_eq!(catalog_code("   "), None);
    }
}
