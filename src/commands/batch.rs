//! Batch command implementation.

use crate::browser::{Browser, ChromiumBrowser};
use crate::config::Config;
use crate::format::Formatter;
use crate::pipeline::{prepare_keys, run_batch};
use crate::writer::ResultWriter;
use anyhow::{bail, Context, Result};
use tracing::{info, warn};

/// Runs a batch of lookup keys through the catalog.
pub struct BatchCommand {
    config: Config,
}

impl BatchCommand {
    /// Creates a new batch command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Launches Chrome, processes `keys` and returns formatted output.
    pub async fn execute(&self, keys: &[String], authenticated: bool, resume: bool) -> Result<String> {
        let browser = ChromiumBrowser::launch(&self.config.launch_options())
            .await
            .context("Failed to launch browser")?;

        let output = self.execute_with_browser(&browser, keys, authenticated, resume).await;

        browser.shutdown().await;
        output
    }

    /// Processes `keys` with a provided browser (for testing).
    pub async fn execute_with_browser(
        &self,
        browser: &dyn Browser,
        keys: &[String],
        authenticated: bool,
        resume: bool,
    ) -> Result<String> {
        let keys = prepare_keys(keys);
        if keys.is_empty() {
            bail!("No lookup keys given");
        }

        if authenticated && self.config.credentials().is_none() {
            warn!("Login requested but no credentials configured; every key will fail to log in");
        }

        let mut writer = if resume {
            ResultWriter::resume(&self.config.output, &keys)?
        } else {
            ResultWriter::open(&self.config.output)?
        };

        let batch = run_batch(browser, &self.config, &keys, authenticated, &mut writer).await;
        info!("Results saved to {}", writer.path().display());

        let formatter = Formatter::new(self.config.format);
        Ok(formatter.format_batch(&batch))
    }
}
