// src/core/errors.rs

//! Defines the primary error type for the entire pipeline.

use thiserror::Error;

/// The main error enum, representing all possible failures within the pipeline.
/// Using `thiserror` allows for clean error definitions and automatic `From` trait implementations.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Malformed input line: {0}")]
    MalformedIndexLine(String),

    #[error("Bad output URI: {0}")]
    BadOutputUri(String),

    #[error("Must set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY when uploading results to S3")]
    MissingCredentials,

    /// A transient transport fault. The prefetcher and the BTC ingestor retry
    /// these with bounded exponential backoff before giving up on the entry.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A non-retryable fault from the object store (e.g. a missing key).
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Archive load failed: {0}")]
    ArchiveLoadFailed(String),

    #[error("Archive check failed: {0}")]
    ArchiveCheckFailed(String),

    #[error("Error processing record: {0}")]
    ProcessorFailure(String),

    #[error("Unknown processor '{0}'")]
    UnknownProcessor(String),

    #[error("Unknown ingestor '{0}'")]
    UnknownIngestor(String),

    /// A block-level fault the BTC ingestor cannot recover from. Unlike a
    /// transport fault, this terminates the run.
    #[error("Fatal block error: {0}")]
    FatalBlock(String),

    #[error("Sink upload failed: {0}")]
    SinkUploadFailed(String),

    #[error("Sink is closed")]
    SinkClosed,

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Internal Error: {0}")]
    Internal(String),
}

// --- From trait implementations for easy error conversion ---

impl From<reqwest::Error> for PipelineError {
    fn from(e: reqwest::Error) -> Self {
        // Status errors are decisions made by the remote end; everything else
        // (connect, timeout, body decode) is transport and retryable.
        if e.is_status() {
            PipelineError::FatalBlock(e.to_string())
        } else {
            PipelineError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        PipelineError::Internal(format!("JSON serialization/deserialization error: {e}"))
    }
}

impl From<base64::DecodeError> for PipelineError {
    fn from(e: base64::DecodeError) -> Self {
        PipelineError::Internal(format!("Base64 decode error: {e}"))
    }
}
