// src/core/ingest/cache.rs

//! The prefetch cache: a background fetcher that downloads and validates
//! archives ahead of consumption, feeding a bounded FIFO. The channel's
//! capacity is the cache bound, and the sender dropping is the end-of-index
//! signal, so the consumer can never deadlock against a slow fetcher.

use crate::core::errors::PipelineError;
use crate::core::index::ArchiveLocator;
use crate::core::storage::ObjectStore;
use crate::core::warc::checker;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{info, warn};

/// A ready-to-read local archive produced by the fetcher and consumed by the
/// demultiplexer, which deletes the file when it rolls past it.
#[derive(Debug)]
pub struct CacheEntry {
    pub locator: ArchiveLocator,
    pub path: PathBuf,
}

/// Tunables for the background fetcher.
#[derive(Debug, Clone)]
pub struct PrefetchConfig {
    /// Upper bound on cache entries at any instant.
    pub max_cache_len: usize,
    /// Scratch directory for downloaded archives.
    pub scratch_dir: PathBuf,
    /// Attempts per download before the entry is skipped.
    pub fetch_retries: u32,
    /// How long the fetcher backs off when the cache is at capacity.
    /// Consumers drain the cache in the meantime.
    pub cache_full_backoff: Duration,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            max_cache_len: 4,
            scratch_dir: std::env::temp_dir(),
            fetch_retries: 3,
            cache_full_backoff: Duration::from_secs(10),
        }
    }
}

/// Bounded FIFO of ready archives plus the handle of the fetcher task that
/// fills it.
pub struct PrefetchCache {
    rx: mpsc::Receiver<CacheEntry>,
    fetcher: JoinHandle<()>,
}

impl PrefetchCache {
    /// Starts the background fetcher over a finite, already-parsed index.
    pub fn spawn(
        locators: Vec<ArchiveLocator>,
        store: Arc<dyn ObjectStore>,
        config: PrefetchConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.max_cache_len.max(1));
        let fetcher = tokio::spawn(fetch_loop(locators, store, tx, config));
        Self { rx, fetcher }
    }

    /// Pops the oldest ready archive, waiting for the fetcher if necessary.
    /// `None` means the index is exhausted and the cache fully drained.
    pub async fn take(&mut self) -> Option<CacheEntry> {
        self.rx.recv().await
    }

    /// Aborts the fetcher, abandoning in-flight downloads. Used by the
    /// driver on fatal errors so a dying run does not strand transfers.
    pub fn abort(&self) {
        self.fetcher.abort();
    }
}

impl Drop for PrefetchCache {
    fn drop(&mut self) {
        self.fetcher.abort();
    }
}

/// The fetcher loop: fill the free cache slots with a parallel batch, sleep
/// while the cache is full, exit when the index runs dry.
async fn fetch_loop(
    locators: Vec<ArchiveLocator>,
    store: Arc<dyn ObjectStore>,
    tx: mpsc::Sender<CacheEntry>,
    config: PrefetchConfig,
) {
    let mut pending = locators.into_iter();
    loop {
        let free = tx.capacity();
        if free == 0 {
            tokio::time::sleep(config.cache_full_backoff).await;
            continue;
        }

        let batch: Vec<ArchiveLocator> = pending.by_ref().take(free).collect();
        if batch.is_empty() {
            break;
        }

        let mut downloads = JoinSet::new();
        for locator in batch {
            let store = store.clone();
            let scratch_dir = config.scratch_dir.clone();
            let retries = config.fetch_retries;
            downloads.spawn(async move { materialize(store, locator, scratch_dir, retries).await });
        }

        // Entries land in the cache in completion order, not index order;
        // the output is a multiset, so that is permitted.
        while let Some(joined) = downloads.join_next().await {
            match joined {
                Ok(Some(entry)) => {
                    if tx.send(entry).await.is_err() {
                        // Consumer is gone; nothing left to fetch for.
                        return;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("archive download task failed: {e}"),
            }
        }
    }
    info!("Hit end of index");
}

/// Downloads and validates one archive, retrying transport faults with
/// exponential backoff. Returns `None` when the entry is skipped.
async fn materialize(
    store: Arc<dyn ObjectStore>,
    locator: ArchiveLocator,
    scratch_dir: PathBuf,
    retries: u32,
) -> Option<CacheEntry> {
    let path = scratch_dir.join(uuid::Uuid::new_v4().to_string());
    info!("Downloading {} to {}", locator.key, path.display());

    let attempts = retries.max(1);
    for attempt in 1..=attempts {
        match store.fetch_to(&locator, &path).await {
            Ok(_) => return validate(locator, path).await,
            Err(PipelineError::Transport(msg)) => {
                if attempt == attempts {
                    warn!("Skipping {} after {attempt} attempts: {msg}", locator.key);
                    break;
                }
                let backoff = Duration::from_secs(1 << (attempt - 1));
                warn!("Retrying ({attempt}) after transport error: {msg}");
                tokio::time::sleep(backoff).await;
            }
            Err(e) => {
                warn!("Skipping {}: {e}", locator.key);
                break;
            }
        }
    }
    let _ = tokio::fs::remove_file(&path).await;
    None
}

/// Runs the check/recompress policy off the async runtime; validation reads
/// the whole archive.
async fn validate(locator: ArchiveLocator, path: PathBuf) -> Option<CacheEntry> {
    info!("Checking {}", path.display());
    let check_path = path.clone();
    let checked =
        tokio::task::spawn_blocking(move || checker::validate_or_recompress(&check_path)).await;
    match checked {
        Ok(Ok(())) => Some(CacheEntry { locator, path }),
        Ok(Err(e)) => {
            warn!("Discarding {}: {e}", locator.key);
            let _ = tokio::fs::remove_file(&path).await;
            None
        }
        Err(e) => {
            warn!("Archive validation task failed: {e}");
            let _ = tokio::fs::remove_file(&path).await;
            None
        }
    }
}
