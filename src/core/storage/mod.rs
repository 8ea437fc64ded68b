// src/core/storage/mod.rs

//! Remote object access: the output-URI grammar and the accessor trait
//! abstracting `file://` from `s3://` storage.

pub mod fs;
pub mod s3;

pub use fs::FsObjectStore;
pub use s3::S3ObjectStore;

use crate::core::errors::PipelineError;
use crate::core::index::ArchiveLocator;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::sync::Arc;

/// Chunk size used when seeking into an object by reading and discarding,
/// for providers that do not accept open-ended range headers.
pub const SEEK_DISCARD_CHUNK: usize = 64 * 1024 * 1024;

static SCHEME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(s3|file)://.*").expect("scheme regex"));
static S3_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^s3://([a-zA-Z0-9\-]+)\.([a-zA-Z0-9\-]+)/(.*)$").expect("s3 regex"));
static FILE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^file://(.*)$").expect("file regex"));

/// Parsed form of a storage URI: `file://<path>` or
/// `s3://<region>.<bucket>/<path>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageDescriptor {
    File {
        path: String,
    },
    S3 {
        region: String,
        bucket: String,
        path: String,
    },
}

impl StorageDescriptor {
    pub fn parse(uri: &str) -> Result<Self, PipelineError> {
        if !SCHEME_RE.is_match(uri) {
            return Err(PipelineError::BadOutputUri(uri.to_string()));
        }
        if let Some(caps) = FILE_RE.captures(uri) {
            return Ok(StorageDescriptor::File {
                path: caps[1].to_string(),
            });
        }
        if let Some(caps) = S3_RE.captures(uri) {
            return Ok(StorageDescriptor::S3 {
                region: caps[1].to_string(),
                bucket: caps[2].to_string(),
                path: caps[3].to_string(),
            });
        }
        Err(PipelineError::BadOutputUri(format!(
            "{uri}. Expected \"s3://<region>.<bucket>/<path>\" or \"file://<path>\""
        )))
    }
}

/// Access to a store of archive objects. `fetch_to` materializes one locator
/// into a local file; `put` uploads a finished local artifact.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Downloads the locator's byte range into `dest`, returning the number
    /// of bytes written. Transient faults surface as
    /// [`PipelineError::Transport`] so the caller can retry.
    async fn fetch_to(&self, locator: &ArchiveLocator, dest: &Path) -> Result<u64, PipelineError>;

    /// Uploads the local file to `key` in the store, returning the number of
    /// bytes written. The remote object's size is taken from the local file
    /// size before streaming.
    async fn put(&self, local: &Path, key: &str) -> Result<u64, PipelineError>;
}

/// Builds the archive-source store for a parsed descriptor. S3 credentials
/// are resolved once, up front; a missing pair fails the run before any
/// ingestion happens.
pub async fn connect(descriptor: &StorageDescriptor) -> Result<Arc<dyn ObjectStore>, PipelineError> {
    match descriptor {
        StorageDescriptor::File { path } => Ok(Arc::new(FsObjectStore::new(path))),
        StorageDescriptor::S3 { region, bucket, .. } => Ok(Arc::new(
            S3ObjectStore::connect(region.clone(), bucket.clone()).await?,
        )),
    }
}
