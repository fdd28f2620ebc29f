//! Hachette catalog command implementation.

use crate::browser::{Browser, ChromiumBrowser};
use crate::config::Config;
use crate::format::Formatter;
use crate::hachette::fetch_catalog;
use anyhow::{bail, Context, Result};

/// Downloads one Hachette trade catalog.
pub struct CatalogCommand {
    config: Config,
}

impl CatalogCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Launches Chrome, downloads the catalog named by `query` and returns
    /// formatted output.
    pub async fn execute(&self, query: &str) -> Result<String> {
        let browser = ChromiumBrowser::launch(&self.config.launch_options())
            .await
            .context("Failed to launch browser")?;

        let output = self.execute_with_browser(&browser, query).await;

        browser.shutdown().await;
        output
    }

    /// Downloads with a provided browser (for testing).
    pub async fn execute_with_browser(&self, browser: &dyn Browser, query: &str) -> Result<String> {
        if query.trim().is_empty() {
            bail!("No catalog given");
        }

        let entries = fetch_catalog(browser, &self.config, query)
            .await
            .with_context(|| format!("Failed to download catalog {}", query.trim()))?;

        Ok(Formatter::new(self.config.format).format_catalog(&entries))
    }
}
