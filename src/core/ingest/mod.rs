// src/core/ingest/mod.rs

//! Record-producing front-ends. Every ingestor implements the same pull
//! contract: one record at a time, `Ok(None)` at end-of-stream.

pub mod btc;
pub mod cache;
pub mod csv;
pub mod warc;

pub use btc::BtcIngestor;
pub use cache::{CacheEntry, PrefetchCache};
pub use csv::CsvIngestor;
pub use warc::WarcIngestor;

use crate::core::errors::PipelineError;
use crate::core::record::Record;
use async_trait::async_trait;
use std::str::FromStr;

/// The pull contract shared by all front-ends. `Ok(None)` is the
/// end-of-stream signal; errors are terminal to the run.
#[async_trait]
pub trait Ingestor: Send {
    async fn next_record(&mut self) -> Result<Option<Record>, PipelineError>;

    /// Releases background resources (the WARC front-end aborts its
    /// prefetcher here). Called by the driver on fatal errors and after a
    /// clean drain; the default is a no-op.
    fn shutdown(&mut self) {}
}

/// The ingestor selector. Unknown names fail fast, before any ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestorKind {
    WarcIndex,
    CsvFile,
    Btc,
}

impl FromStr for IngestorKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "warc-index" => Ok(IngestorKind::WarcIndex),
            "csv-file" => Ok(IngestorKind::CsvFile),
            "btc" => Ok(IngestorKind::Btc),
            other => Err(PipelineError::UnknownIngestor(other.to_string())),
        }
    }
}
