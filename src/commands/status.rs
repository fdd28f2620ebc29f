//! Status command implementation.

use crate::config::Config;
use crate::format::Formatter;
use crate::writer::read_partial;
use anyhow::Result;
use std::path::PathBuf;

/// Reports on a results file, finished or still being written.
pub struct StatusCommand {
    config: Config,
}

impl StatusCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Reads the configured results file and summarizes its progress.
    pub fn execute(&self, full: bool) -> Result<String> {
        let path: PathBuf = self.config.output.clone();
        let batch = read_partial(&path)?;

        let formatter = Formatter::new(self.config.format);
        if full {
            Ok(formatter.format_batch(&batch))
        } else {
            Ok(formatter.format_progress(&batch, &path))
        }
    }
}
