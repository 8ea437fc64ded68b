// src/core/sink.rs

//! The output sink: a mutex-guarded appender that turns each row into one
//! compressed, base64-encoded line of the shared artifact. Concurrent
//! appends always produce whole lines.

use crate::core::errors::PipelineError;
use crate::core::record::OutputRow;
use crate::core::storage::{ObjectStore, S3ObjectStore, StorageDescriptor, s3};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

/// Where the finished artifact ends up.
enum SinkTarget {
    /// No output URI was given; lines go to stdout.
    Stdout,
    /// A local file, written in place.
    File,
    /// A local spool uploaded to S3 on close.
    S3 {
        region: String,
        bucket: String,
        path: String,
        spool: PathBuf,
    },
}

struct SinkInner {
    writer: Option<Box<dyn Write + Send>>,
    closed: bool,
}

/// Thread-safe append-only artifact writer.
///
/// The local file is opened in append mode, so two concurrent runs writing
/// to the same `file://` path interleave whole lines across runs.
pub struct OutputSink {
    inner: Mutex<SinkInner>,
    target: SinkTarget,
}

impl OutputSink {
    /// Opens the sink for a parsed output descriptor, or for stdout when no
    /// output was configured. S3 credentials are verified here, before any
    /// ingestion starts.
    pub fn open(descriptor: Option<StorageDescriptor>) -> Result<Self, PipelineError> {
        let (writer, target): (Box<dyn Write + Send>, SinkTarget) = match descriptor {
            None => (Box::new(std::io::stdout()), SinkTarget::Stdout),
            Some(StorageDescriptor::File { path }) => {
                let file = OpenOptions::new().create(true).append(true).open(&path)?;
                (Box::new(file), SinkTarget::File)
            }
            Some(StorageDescriptor::S3 {
                region,
                bucket,
                path,
            }) => {
                s3::credentials_from_env()?;
                let spool = std::env::temp_dir().join(format!(
                    "{}{}-{}",
                    Uuid::new_v4(),
                    bucket,
                    path.replace('/', ":")
                ));
                let file = OpenOptions::new().create(true).append(true).open(&spool)?;
                (
                    Box::new(file),
                    SinkTarget::S3 {
                        region,
                        bucket,
                        path,
                        spool,
                    },
                )
            }
        };
        Ok(Self {
            inner: Mutex::new(SinkInner {
                writer: Some(writer),
                closed: false,
            }),
            target,
        })
    }

    /// Appends one row as a whole line: compact JSON, gzip level 9, base64,
    /// trailing newline.
    pub fn append(&self, row: &OutputRow) -> Result<(), PipelineError> {
        let line = encode_row(row)?;
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(PipelineError::SinkClosed);
        }
        let writer = inner.writer.as_mut().ok_or(PipelineError::SinkClosed)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    /// Closes the local file and, for a remote descriptor, uploads it. A
    /// second call is a no-op.
    pub async fn close_and_flush(&self) -> Result<(), PipelineError> {
        {
            let mut inner = self.inner.lock();
            if inner.closed {
                return Ok(());
            }
            inner.closed = true;
            if let Some(mut writer) = inner.writer.take() {
                writer.flush()?;
            }
        }

        if let SinkTarget::S3 {
            region,
            bucket,
            path,
            spool,
        } = &self.target
        {
            info!("Flushing {} to s3://{region}.{bucket}/{path}", spool.display());
            let store = S3ObjectStore::connect(region.clone(), bucket.clone())
                .await
                .map_err(|e| PipelineError::SinkUploadFailed(e.to_string()))?;
            store
                .put(spool, path)
                .await
                .map_err(|e| PipelineError::SinkUploadFailed(e.to_string()))?;
        }
        Ok(())
    }
}

/// Encodes one row into its line form: `base64(gzip(json(row)))`.
pub fn encode_row(row: &OutputRow) -> Result<String, PipelineError> {
    let json = serde_json::to_vec(row)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::new(9));
    encoder.write_all(&json)?;
    let compressed = encoder.finish()?;
    Ok(BASE64.encode(compressed))
}

/// Decodes one artifact line back into a row. The inverse of [`encode_row`];
/// used by downstream consumers and the tests.
pub fn decode_line(line: &str) -> Result<OutputRow, PipelineError> {
    let compressed = BASE64.decode(line.trim_end())?;
    let mut decoder = GzDecoder::new(compressed.as_slice());
    let mut json = Vec::new();
    decoder.read_to_end(&mut json)?;
    Ok(serde_json::from_slice(&json)?)
}
