// src/core/ingest/warc.rs

//! The archive demultiplexer: stitches the prefetch cache's successive
//! archives into a single stream of response records, each stamped with its
//! source archive's derived timestamp.

use crate::core::errors::PipelineError;
use crate::core::ingest::cache::{CacheEntry, PrefetchCache};
use crate::core::ingest::Ingestor;
use crate::core::record::Record;
use crate::core::warc::{HEADER_TARGET_URI, RECORD_TYPE_RESPONSE, WarcReader};
use async_trait::async_trait;
use std::io::BufRead;
use std::path::PathBuf;
use tracing::warn;

struct OpenArchive {
    reader: WarcReader<Box<dyn BufRead + Send>>,
    ts: f64,
    path: PathBuf,
}

/// Pulls archives from the prefetch cache and iterates their response-type
/// records, rolling to the next archive transparently.
pub struct WarcIngestor {
    cache: PrefetchCache,
    current: Option<OpenArchive>,
    keep_local_files: bool,
}

impl WarcIngestor {
    pub fn new(cache: PrefetchCache, keep_local_files: bool) -> Self {
        Self {
            cache,
            current: None,
            keep_local_files,
        }
    }

    /// Closes the current archive and deletes its local copy.
    fn roll(&mut self) {
        if let Some(archive) = self.current.take()
            && !self.keep_local_files
        {
            let _ = std::fs::remove_file(&archive.path);
        }
    }

    fn open(&mut self, entry: CacheEntry) {
        let ts = entry.locator.timestamp();
        match WarcReader::open(&entry.path) {
            Ok(reader) => {
                self.current = Some(OpenArchive {
                    reader,
                    ts,
                    path: entry.path,
                });
            }
            Err(e) => {
                warn!("Failed to open archive {}: {e}", entry.locator.key);
                if !self.keep_local_files {
                    let _ = std::fs::remove_file(&entry.path);
                }
            }
        }
    }
}

#[async_trait]
impl Ingestor for WarcIngestor {
    async fn next_record(&mut self) -> Result<Option<Record>, PipelineError> {
        loop {
            if self.current.is_none() {
                match self.cache.take().await {
                    Some(entry) => {
                        self.open(entry);
                        continue;
                    }
                    None => return Ok(None),
                }
            }
            let Some(archive) = self.current.as_mut() else {
                continue;
            };

            match archive.reader.next_record() {
                Ok(Some(record)) => {
                    if record.record_type() != RECORD_TYPE_RESPONSE {
                        continue;
                    }
                    let uri = record.header(HEADER_TARGET_URI).unwrap_or_default();
                    let normalized = Record::from_bytes(uri, archive.ts, &record.content);
                    return Ok(Some(normalized));
                }
                Ok(None) => {
                    // End of this archive; advance to the next one.
                    self.roll();
                }
                Err(e) => {
                    warn!("Archive load failed: {e}");
                }
            }
        }
    }

    fn shutdown(&mut self) {
        self.cache.abort();
        self.roll();
    }
}
