// src/config.rs

//! Manages pipeline configuration: defaults, optional TOML file loading,
//! and the knobs the CLI overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    /// Worker pool size; also the number of semaphore permits bounding
    /// in-flight records.
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Upper bound on prefetched archives held locally at any instant.
    #[serde(default = "default_max_cache_len")]
    pub max_cache_len: usize,

    /// Where downloaded archives and the S3 spool file are materialized.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Keep consumed local archives instead of deleting them on roll.
    #[serde(default)]
    pub keep_local_files: bool,

    /// Download attempts per archive before the entry is skipped.
    #[serde(default = "default_fetch_retries")]
    pub fetch_retries: u32,

    /// Where the WARC index's keys live, as a storage URI
    /// (`s3://<region>.<bucket>/` or `file://<root>`).
    #[serde(default = "default_archive_source")]
    pub archive_source: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            max_cache_len: default_max_cache_len(),
            scratch_dir: default_scratch_dir(),
            keep_local_files: false,
            fetch_retries: default_fetch_retries(),
            archive_source: default_archive_source(),
            log_level: default_log_level(),
        }
    }
}

fn default_threads() -> usize {
    16
}
fn default_max_cache_len() -> usize {
    4
}
fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir()
}
fn default_fetch_retries() -> u32 {
    3
}
fn default_archive_source() -> String {
    "s3://us-east-1.commoncrawl/".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Loads configuration from a TOML file, falling back to defaults for
    /// anything absent. A missing file is not an error; a malformed one is.
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .build()
            .with_context(|| format!("failed to read configuration from {path}"))?;
        settings
            .try_deserialize()
            .with_context(|| format!("invalid configuration in {path}"))
    }
}
