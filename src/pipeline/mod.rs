// src/pipeline/mod.rs

//! The pipeline driver: pulls records from the chosen ingestor, fans them
//! out to a bounded worker pool, and coalesces the rows into the shared
//! sink. The semaphore is the system's backpressure against a fast
//! ingestor; memory stays bounded by the permit count.

use crate::core::errors::PipelineError;
use crate::core::ingest::Ingestor;
use crate::core::processors::Processor;
use crate::core::record::{OutputRow, Record, error_row};
use crate::core::sink::OutputSink;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

/// Rows accumulate in the shared buffer and are flushed through the sink
/// whenever the buffer crosses a multiple of this many rows.
const FLUSH_EVERY: usize = 100;

pub struct PipelineDriver {
    processor: Processor,
    sink: Arc<OutputSink>,
    threads: usize,
}

impl PipelineDriver {
    pub fn new(processor: Processor, sink: Arc<OutputSink>, threads: usize) -> Self {
        Self {
            processor,
            sink,
            threads: threads.max(1),
        }
    }

    /// Runs the pipeline to completion: ingest, process, flush, close.
    /// Worker faults are contained to error rows; only ingestor-terminal and
    /// sink faults abort the run.
    pub async fn run(&self, mut ingestor: Box<dyn Ingestor>) -> Result<(), PipelineError> {
        let semaphore = Arc::new(Semaphore::new(self.threads));
        let buffer: Arc<Mutex<Vec<OutputRow>>> = Arc::new(Mutex::new(Vec::new()));
        let mut workers = JoinSet::new();

        loop {
            let record = match ingestor.next_record().await {
                Ok(Some(record)) => record,
                Ok(None) => break,
                Err(e) => {
                    // Terminal ingestor fault: stop feeding, cancel the
                    // background fetcher, let in-flight workers finish.
                    ingestor.shutdown();
                    while workers.join_next().await.is_some() {}
                    return Err(e);
                }
            };

            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| PipelineError::Internal(format!("semaphore closed: {e}")))?;
            let processor = self.processor;
            let sink = self.sink.clone();
            let buffer = buffer.clone();
            workers.spawn(async move {
                process_one(processor, record, &buffer, &sink);
                drop(permit);
            });

            // Reap finished workers so the join set stays near the permit
            // count.
            while workers.try_join_next().is_some() {}
        }

        ingestor.shutdown();
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!("Worker task failed: {e}");
            }
        }

        flush_results(&buffer, &self.sink)?;
        self.sink.close_and_flush().await
    }
}

/// One worker: apply the transformation, buffer the rows, flush on the
/// boundary. Failures become error rows or log lines; the permit is always
/// released (dropped by the caller).
fn process_one(
    processor: Processor,
    record: Record,
    buffer: &Mutex<Vec<OutputRow>>,
    sink: &OutputSink,
) {
    let rows = match processor.process(&record) {
        Ok(rows) => rows,
        Err(e) => {
            warn!("{e}");
            vec![error_row(e.to_string())]
        }
    };

    let buffered = {
        let mut guard = buffer.lock();
        guard.extend(rows);
        guard.len()
    };

    // The length check happens outside the drain lock, so two workers can
    // both observe the same boundary; the loser drains an empty buffer,
    // which is a no-op.
    if buffered > 0 && buffered % FLUSH_EVERY == 0 {
        if let Err(e) = flush_results(buffer, sink) {
            error!("Error flushing results: {e}");
        }
    }
}

/// Drains the buffer through the sink, one whole line per row, holding the
/// buffer lock across the entire flush.
fn flush_results(buffer: &Mutex<Vec<OutputRow>>, sink: &OutputSink) -> Result<(), PipelineError> {
    let mut guard = buffer.lock();
    if guard.is_empty() {
        return Ok(());
    }
    debug!("Appending {} results", guard.len());
    for row in guard.drain(..) {
        sink.append(&row)?;
    }
    Ok(())
}
