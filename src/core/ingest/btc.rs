// src/core/ingest/btc.rs

//! Blockchain front-end: fetches a contiguous range of per-block JSON
//! documents over HTTP, one record per block index.

use crate::core::errors::PipelineError;
use crate::core::ingest::Ingestor;
use crate::core::record::Record;
use async_trait::async_trait;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::warn;

/// Attempts per block before a transport fault demotes the block to a
/// skip-with-warning.
const FETCH_ATTEMPTS: u32 = 3;

pub struct BtcIngestor {
    client: reqwest::Client,
    base_url: String,
    current: u64,
    end: u64,
}

impl BtcIngestor {
    /// Parses the single-line input spec `<base_url>,<begin>,<end>`.
    pub fn from_spec(spec: &str) -> Result<Self, PipelineError> {
        let malformed = || PipelineError::MalformedIndexLine(spec.trim_end().to_string());
        let parts: Vec<&str> = spec.trim().split(',').collect();
        let [base_url, begin, end] = parts.as_slice() else {
            return Err(malformed());
        };
        let begin: u64 = begin.parse().map_err(|_| malformed())?;
        let end: u64 = end.parse().map_err(|_| malformed())?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: base_url.to_string(),
            current: begin,
            end,
        })
    }

    async fn fetch_block(&self, url: &str) -> Result<String, PipelineError> {
        let response = self
            .client
            .get(url)
            .query(&[("format", "json")])
            .send()
            .await?;
        // Non-success statuses are final answers from the provider, not
        // transient faults.
        let response = response.error_for_status()?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl Ingestor for BtcIngestor {
    async fn next_record(&mut self) -> Result<Option<Record>, PipelineError> {
        'blocks: while self.current <= self.end {
            let index = self.current;
            let url = format!("{}/{}", self.base_url, index);

            for attempt in 1..=FETCH_ATTEMPTS {
                match self.fetch_block(&url).await {
                    Ok(body) => {
                        self.current += 1;
                        return Ok(Some(Record::new(url, wall_clock_seconds(), body)));
                    }
                    Err(PipelineError::Transport(msg)) => {
                        if attempt == FETCH_ATTEMPTS {
                            // Exhausted transport retries: skip this block
                            // rather than terminating the whole range.
                            warn!("Skipping block {index} after {attempt} attempts: {msg}");
                            self.current += 1;
                            continue 'blocks;
                        }
                        warn!("Retrying ({attempt}) after transport error: {msg}");
                        tokio::time::sleep(Duration::from_secs(1 << (attempt - 1))).await;
                    }
                    Err(e) => {
                        return Err(PipelineError::FatalBlock(format!("block {index}: {e}")));
                    }
                }
            }
        }
        Ok(None)
    }
}

fn wall_clock_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
