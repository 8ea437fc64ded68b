// src/core/storage/fs.rs

//! Filesystem-backed object store. Keys are paths relative to a root
//! directory. This is the `file://` accessor and the store every
//! integration test runs against.

use crate::core::errors::PipelineError;
use crate::core::index::ArchiveLocator;
use crate::core::storage::ObjectStore;
use async_trait::async_trait;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, BufReader};

pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn fetch_to(&self, locator: &ArchiveLocator, dest: &Path) -> Result<u64, PipelineError> {
        let src = self.resolve(&locator.key);
        let mut file = File::open(&src)
            .await
            .map_err(|e| PipelineError::Storage(format!("{}: {e}", src.display())))?;
        if locator.offset > 0 {
            file.seek(SeekFrom::Start(locator.offset)).await?;
        }

        let mut out = File::create(dest).await?;
        let written = if locator.length > -1 {
            let mut limited = BufReader::new(file).take(locator.length as u64);
            tokio::io::copy(&mut limited, &mut out).await?
        } else {
            tokio::io::copy(&mut file, &mut out).await?
        };
        Ok(written)
    }

    async fn put(&self, local: &Path, key: &str) -> Result<u64, PipelineError> {
        let dest = self.resolve(key);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(tokio::fs::copy(local, &dest).await?)
    }
}
