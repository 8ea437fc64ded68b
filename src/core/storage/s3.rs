// src/core/storage/s3.rs

//! S3-backed object store. Credentials are resolved once from the
//! environment; range requests are used whenever a length is known, and a
//! read-and-discard seek covers providers that reject open-ended ranges.

use crate::core::errors::PipelineError;
use crate::core::index::ArchiveLocator;
use crate::core::storage::{ObjectStore, SEEK_DISCARD_CHUNK};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

/// Reads the AWS credential pair from the environment. Absence of either
/// variable is a configuration fault reported before any ingestion.
pub fn credentials_from_env() -> Result<(String, String), PipelineError> {
    match (
        std::env::var("AWS_ACCESS_KEY_ID"),
        std::env::var("AWS_SECRET_ACCESS_KEY"),
    ) {
        (Ok(id), Ok(secret)) => Ok((id, secret)),
        _ => Err(PipelineError::MissingCredentials),
    }
}

impl S3ObjectStore {
    /// Builds a client for one bucket in one region, failing fast when the
    /// environment carries no credentials.
    pub async fn connect(region: String, bucket: String) -> Result<Self, PipelineError> {
        let (access_key_id, secret_access_key) = credentials_from_env()?;
        let credentials = Credentials::new(access_key_id, secret_access_key, None, None, "env");
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region))
            .credentials_provider(credentials)
            .build();
        Ok(Self {
            client: Client::from_conf(config),
            bucket,
        })
    }
}

/// Maps an SDK failure onto the pipeline's retry taxonomy: service-level
/// answers (missing key, access denied) are final, everything else is
/// transport.
fn classify<E, R>(e: SdkError<E, R>) -> PipelineError
where
    E: std::fmt::Debug,
    R: std::fmt::Debug,
{
    match &e {
        SdkError::ServiceError(_) => PipelineError::Storage(format!("{e:?}")),
        _ => PipelineError::Transport(format!("{e:?}")),
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn fetch_to(&self, locator: &ArchiveLocator, dest: &Path) -> Result<u64, PipelineError> {
        let mut request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&locator.key);
        if locator.length > -1 {
            // HTTP ranges are end-inclusive.
            let end = locator.offset + locator.length as u64 - 1;
            request = request.range(format!("bytes={}-{}", locator.offset, end));
        }

        let response = request.send().await.map_err(classify)?;
        let mut body = response.body.into_async_read();

        // No length but a starting offset: seek by discarding. Open-ended
        // range headers are not accepted everywhere.
        if locator.offset > 0 && locator.length == -1 {
            let mut remaining = locator.offset;
            let mut scratch = vec![0u8; SEEK_DISCARD_CHUNK.min(locator.offset as usize)];
            while remaining > 0 {
                let want = scratch.len().min(remaining as usize);
                let read = body
                    .read(&mut scratch[..want])
                    .await
                    .map_err(|e| PipelineError::Transport(e.to_string()))?;
                if read == 0 {
                    return Err(PipelineError::Storage(format!(
                        "object {} shorter than seek offset {}",
                        locator.key, locator.offset
                    )));
                }
                remaining -= read as u64;
            }
        }

        let mut out = File::create(dest).await?;
        let written = tokio::io::copy(&mut body, &mut out)
            .await
            .map_err(|e| PipelineError::Transport(e.to_string()))?;
        Ok(written)
    }

    async fn put(&self, local: &Path, key: &str) -> Result<u64, PipelineError> {
        let size = tokio::fs::metadata(local).await?.len();
        let body = ByteStream::from_path(local)
            .await
            .map_err(|e| PipelineError::Storage(e.to_string()))?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_length(size as i64)
            .body(body)
            .send()
            .await
            .map_err(classify)?;
        Ok(size)
    }
}
