//! Batch orchestration: one isolated session per key, strictly sequential.

use crate::browser::{settle, Browser};
use crate::catalog::{BatchResult, KeyResult, KeyStatus, LookupKey};
use crate::config::Config;
use crate::extract::RecordExtractor;
use crate::search::{SearchController, SearchOutcome};
use crate::session::{Readiness, Session};
use crate::writer::ResultWriter;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Lifecycle of one key inside a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStage {
    Pending,
    SessionReady,
    Searching,
    Extracting,
    Completed(KeyStatus),
}

struct KeyProgress<'a> {
    key: &'a LookupKey,
    stage: KeyStage,
}

impl<'a> KeyProgress<'a> {
    fn new(key: &'a LookupKey) -> Self {
        Self { key, stage: KeyStage::Pending }
    }

    fn advance(&mut self, next: KeyStage) {
        debug!("{}: {:?} -> {:?}", self.key, self.stage, next);
        self.stage = next;
    }
}

/// Trims raw input keys, drops empty ones and keeps the first occurrence of
/// each duplicate.
pub fn prepare_keys<S: AsRef<str>>(raw: &[S]) -> Vec<LookupKey> {
    let mut seen = HashSet::new();
    let mut keys = Vec::with_capacity(raw.len());

    for item in raw {
        let Some(key) = LookupKey::new(item.as_ref()) else {
            debug!("Skipping empty key");
            continue;
        };
        if seen.insert(key.clone()) {
            keys.push(key);
        } else {
            warn!("Duplicate key {} ignored", key);
        }
    }
    keys
}

/// Processes `keys` in order, persisting each result through `writer` as soon
/// as it is known, then finalizes the summary.
///
/// Keys the writer already holds (a resumed file) are skipped. Never fails:
/// every key ends with exactly one [`KeyResult`], and persistence failures
/// are logged without stopping the batch.
pub async fn run_batch(
    browser: &dyn Browser,
    config: &Config,
    keys: &[LookupKey],
    authenticated: bool,
    writer: &mut ResultWriter,
) -> BatchResult {
    let total = keys.len();
    info!("Processing {} key(s) (authenticated: {})", total, authenticated);

    for (index, key) in keys.iter().enumerate() {
        if writer.contains(key) {
            info!("[{}/{}] {} already done, skipping", index + 1, total, key);
            continue;
        }

        info!("[{}/{}] Processing {}", index + 1, total, key);
        let result = process_key(browser, config, key, authenticated).await;
        info!("[{}/{}] {}: {}", index + 1, total, result.status, result.message);

        if let Err(e) = writer.append(key, result) {
            error!("Failed to persist result for {}: {:#}", key, e);
        }

        if index + 1 < total {
            pause_between_keys(config).await;
        }
    }

    match writer.finalize(total) {
        Ok(summary) => info!(
            "Completed {} key(s): {} with data, {} without, {} book(s)",
            summary.total_isbns_processed,
            summary.isbns_with_data,
            summary.isbns_without_data,
            summary.total_books_found
        ),
        Err(e) => error!("Failed to persist final summary: {:#}", e),
    }

    writer.result().clone()
}

/// Runs one key end to end in its own session. The session is released on
/// every path.
pub async fn process_key(
    browser: &dyn Browser,
    config: &Config,
    key: &LookupKey,
    authenticated: bool,
) -> KeyResult {
    let mut progress = KeyProgress::new(key);

    let result = match Session::open(browser).await {
        Ok(mut session) => {
            let result = run_key(&mut session, config, &mut progress, authenticated).await;
            session.close().await;
            result
        }
        Err(e) => KeyResult::error(e.to_string()),
    };

    progress.advance(KeyStage::Completed(result.status));
    result
}

async fn run_key(
    session: &mut Session,
    config: &Config,
    progress: &mut KeyProgress<'_>,
    authenticated: bool,
) -> KeyResult {
    let key = progress.key;

    match session.establish(config, authenticated).await {
        Ok(Readiness::Ready) => progress.advance(KeyStage::SessionReady),
        Ok(Readiness::LoginFailed) => return KeyResult::login_failed(key),
        Err(e) => return KeyResult::error(e.to_string()),
    }

    progress.advance(KeyStage::Searching);
    let rows = match SearchController::new(session.page(), &config.waits).search(key).await {
        Ok(SearchOutcome::Found(rows)) => rows,
        Ok(SearchOutcome::NotFound) => return KeyResult::not_found(key),
        Err(e) => return KeyResult::error(e.to_string()),
    };

    progress.advance(KeyStage::Extracting);
    let books = RecordExtractor::new(session.page(), &config.waits, authenticated)
        .extract_all(rows)
        .await;

    KeyResult::found(key, books)
}

/// Adds a random delay between keys.
async fn pause_between_keys(config: &Config) {
    let jitter = if config.delay_jitter_ms > 0 {
        rand::random_range(0..=config.delay_jitter_ms)
    } else {
        0
    };

    let total_delay = config.delay_ms + jitter;
    if total_delay > 0 {
        debug!("Waiting {}ms before next key", total_delay);
    }
    settle(Duration::from_millis(total_delay)).await;
}
