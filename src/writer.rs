//! Incremental, crash-tolerant results file.
//!
//! The file always holds a complete JSON document. Every append rewrites it
//! through a temporary file in the same directory that is synced and renamed
//! over the destination, so a crash leaves either the previous or the new
//! version, never a torn one. The summary stays zeroed until [`ResultWriter::finalize`].

use crate::catalog::{BatchResult, KeyResult, LookupKey, Summary};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Owns the results file for one batch.
#[derive(Debug)]
pub struct ResultWriter {
    path: PathBuf,
    result: BatchResult,
}

impl ResultWriter {
    /// Starts a fresh results file with a zero summary and no results.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let writer = Self { path: path.into(), result: BatchResult::default() };
        writer.persist()?;
        info!("Writing results to {}", writer.path.display());
        Ok(writer)
    }

    /// Reopens an existing results file, keeping only results for `keys`.
    ///
    /// Falls back to [`ResultWriter::open`] when the file does not exist.
    pub fn resume(path: impl Into<PathBuf>, keys: &[LookupKey]) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Self::open(path);
        }

        let mut result = read_partial(&path)?;
        let before = result.results_by_isbn.len();
        result.results_by_isbn.retain(|key, _| keys.iter().any(|k| k.as_str() == key));
        result.summary = Summary::default();

        let dropped = before - result.results_by_isbn.len();
        if dropped > 0 {
            debug!("Dropped {} result(s) for keys not in this batch", dropped);
        }

        let writer = Self { path, result };
        writer.persist()?;
        info!(
            "Resuming {} with {} completed key(s)",
            writer.path.display(),
            writer.result.results_by_isbn.len()
        );
        Ok(writer)
    }

    /// Records the result for `key` and persists immediately.
    pub fn append(&mut self, key: &LookupKey, result: KeyResult) -> Result<()> {
        self.result.results_by_isbn.insert(key.to_string(), result);
        self.persist()
    }

    /// True when `key` already has a result.
    pub fn contains(&self, key: &LookupKey) -> bool {
        self.result.results_by_isbn.contains_key(key.as_str())
    }

    /// Computes the final summary over `total_keys` keys and persists it.
    pub fn finalize(&mut self, total_keys: usize) -> Result<Summary> {
        self.result.summary = self.result.summarize(total_keys);
        self.persist()?;
        Ok(self.result.summary)
    }

    pub fn result(&self) -> &BatchResult {
        &self.result
    }

    pub fn into_result(self) -> BatchResult {
        self.result
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;

        serde_json::to_writer_pretty(&mut tmp, &self.result)
            .context("Failed to serialize results")?;
        tmp.write_all(b"\n").context("Failed to write results")?;
        tmp.as_file().sync_all().context("Failed to sync results")?;

        tmp.persist(&self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        sync_dir(dir)?;

        debug!(
            "Persisted {} result(s) to {}",
            self.result.results_by_isbn.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Reads a results file, complete or partial.
pub fn read_partial(path: impl AsRef<Path>) -> Result<BatchResult> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read results file: {}", path.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse results file: {}", path.display()))
}

/// Flushes a directory entry so a completed rename survives a crash.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    std::fs::File::open(dir)
        .and_then(|d| d.sync_all())
        .with_context(|| format!("Failed to sync directory {}", dir.display()))
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
