// src/core/index.rs

//! Parsing of archive-locator index lines and derivation of the per-archive
//! wall-clock timestamp from the archive key.

use crate::core::errors::PipelineError;
use chrono::{Local, NaiveDateTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;

/// A 14-digit `YYYYMMDDhhmmss` block followed by a `-NNNNN` segment counter,
/// the naming convention of crawl archive keys.
static ARCHIVE_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]{14})-[0-9]{5}").expect("archive key regex"));

/// A `YYYY/MM/DD/<n>/<ms>_<n>` path, where `<ms>` is a millisecond epoch.
static DATED_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9]{4}/[0-9]{2}/[0-9]{2}/[0-9]+/([0-9]+)_[0-9]+").expect("dated path regex")
});

/// Locates one archive inside remote storage. Parsed from a single index
/// line of one to three whitespace-separated tokens:
/// `key` | `key offset` | `key offset length`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLocator {
    /// Opaque identifier of the archive in remote storage.
    pub key: String,
    /// Non-negative byte position to start reading from.
    pub offset: u64,
    /// Byte count to read, or `-1` meaning "to the end of the object".
    pub length: i64,
}

impl ArchiveLocator {
    pub fn new(key: impl Into<String>, offset: u64, length: i64) -> Self {
        Self {
            key: key.into(),
            offset,
            length,
        }
    }

    /// Parses one index line. Anything other than 1-3 tokens, a non-integer
    /// offset/length, or a non-positive explicit length is malformed.
    pub fn parse(line: &str) -> Result<Self, PipelineError> {
        let malformed = || PipelineError::MalformedIndexLine(line.trim_end().to_string());
        let tokens: Vec<&str> = line.split_whitespace().collect();

        let locator = match tokens.as_slice() {
            [key] => Self::new(*key, 0, -1),
            [key, offset] => Self::new(*key, offset.parse().map_err(|_| malformed())?, -1),
            [key, offset, length] => Self::new(
                *key,
                offset.parse().map_err(|_| malformed())?,
                length.parse().map_err(|_| malformed())?,
            ),
            _ => return Err(malformed()),
        };

        if locator.length != -1 && locator.length <= 0 {
            return Err(malformed());
        }
        Ok(locator)
    }

    /// Derives a wall-clock timestamp (seconds since epoch) from the archive
    /// key. Two probes are tried in order; when neither matches, the
    /// timestamp is `0.0` so every record still carries a finite value.
    pub fn timestamp(&self) -> f64 {
        if let Some(caps) = ARCHIVE_KEY_RE.captures(&self.key) {
            return local_epoch_seconds(&caps[1]).unwrap_or(0.0);
        }
        if let Some(caps) = DATED_PATH_RE.captures(&self.key)
            && let Ok(millis) = caps[1].parse::<i64>()
        {
            // Millisecond epochs round down to whole seconds.
            return (millis / 1000) as f64;
        }
        0.0
    }
}

/// Interprets a 14-digit `YYYYMMDDhhmmss` block as a local-time wall-clock
/// moment and returns its Unix epoch seconds.
fn local_epoch_seconds(digits: &str) -> Option<f64> {
    let naive = NaiveDateTime::parse_from_str(digits, "%Y%m%d%H%M%S").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp() as f64)
}

/// Parses a whole index file's worth of lines up front. The index is finite
/// and known before ingestion starts, so a malformed line aborts the run
/// before the first download.
pub fn parse_index(contents: &str) -> Result<Vec<ArchiveLocator>, PipelineError> {
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(ArchiveLocator::parse)
        .collect()
}
