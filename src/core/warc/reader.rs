// src/core/warc/reader.rs

//! Incremental WARC parsing. The reader walks one archive record by record,
//! transparently decoding multi-member gzip, and resynchronizes on the next
//! record boundary after damage instead of giving up on the whole archive.

use crate::core::errors::PipelineError;
use flate2::bufread::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// One parsed WARC record: the version line, its headers in file order, and
/// the raw content block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarcRecord {
    pub version: String,
    pub headers: Vec<(String, String)>,
    pub content: Vec<u8>,
}

impl WarcRecord {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The `WARC-Type` of this record; records without one are untyped and
    /// never match the response filter.
    pub fn record_type(&self) -> &str {
        self.header("WARC-Type").unwrap_or("")
    }
}

/// A forward-only reader over one archive. `next_record` yields records until
/// end-of-archive (`Ok(None)`); a malformed region yields one
/// `ArchiveLoadFailed` and positions the reader at the next record boundary.
pub struct WarcReader<R: BufRead> {
    input: R,
    /// A version line consumed while resynchronizing, pending for the next
    /// record.
    pending_version: Option<String>,
    done: bool,
}

impl WarcReader<Box<dyn BufRead + Send>> {
    /// Opens a local archive, sniffing the gzip magic to pick between the
    /// multi-member decoder and plain reads.
    pub fn open(path: &Path) -> Result<Self, PipelineError> {
        let file = File::open(path)?;
        let mut buffered = BufReader::new(file);
        let head = buffered.fill_buf()?;
        let input: Box<dyn BufRead + Send> = if head.starts_with(&GZIP_MAGIC) {
            Box::new(BufReader::new(MultiGzDecoder::new(buffered)))
        } else {
            Box::new(buffered)
        };
        Ok(Self::new(input))
    }
}

impl<R: BufRead> WarcReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            pending_version: None,
            done: false,
        }
    }

    /// Yields the next record, `Ok(None)` at end-of-archive, or an
    /// `ArchiveLoadFailed` for a damaged region (after which the reader is
    /// already positioned at the next candidate record).
    pub fn next_record(&mut self) -> Result<Option<WarcRecord>, PipelineError> {
        if self.done {
            return Ok(None);
        }

        let version = match self.take_version()? {
            Some(v) => v,
            None => return Ok(None),
        };

        let headers = match self.read_headers() {
            Ok(h) => h,
            Err(e) => return Err(self.resync(e)),
        };

        let content_length = match headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("Content-Length"))
            .and_then(|(_, v)| v.parse::<usize>().ok())
        {
            Some(n) => n,
            None => return Err(self.resync("record without a valid Content-Length".to_string())),
        };

        let mut content = vec![0u8; content_length];
        if let Err(e) = self.input.read_exact(&mut content) {
            // Truncated content block; nothing left to resync against.
            self.done = true;
            return Err(PipelineError::ArchiveLoadFailed(format!(
                "truncated record content: {e}"
            )));
        }

        Ok(Some(WarcRecord {
            version,
            headers,
            content,
        }))
    }

    /// Finds the next version line: either one left over from a resync, or
    /// the next non-blank line, which must open a record.
    fn take_version(&mut self) -> Result<Option<String>, PipelineError> {
        if let Some(v) = self.pending_version.take() {
            return Ok(Some(v));
        }
        loop {
            let line = match self.read_line() {
                Ok(Some(l)) => l,
                Ok(None) => {
                    self.done = true;
                    return Ok(None);
                }
                Err(e) => {
                    // An IO fault here is typically a corrupt gzip member;
                    // the stream cannot be trusted past it.
                    self.done = true;
                    return Err(PipelineError::ArchiveLoadFailed(e.to_string()));
                }
            };
            let trimmed = line.trim_end_matches(['\r', '\n']);
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with("WARC/") {
                return Ok(Some(trimmed.to_string()));
            }
            return Err(self.resync(format!("expected record header, found {trimmed:?}")));
        }
    }

    fn read_headers(&mut self) -> Result<Vec<(String, String)>, String> {
        let mut headers = Vec::new();
        loop {
            let line = match self.read_line() {
                Ok(Some(l)) => l,
                Ok(None) => return Err("unexpected end of archive in record headers".to_string()),
                Err(e) => return Err(e.to_string()),
            };
            let trimmed = line.trim_end_matches(['\r', '\n']);
            if trimmed.is_empty() {
                return Ok(headers);
            }
            match trimmed.split_once(':') {
                Some((name, value)) => {
                    headers.push((name.trim().to_string(), value.trim().to_string()));
                }
                None => return Err(format!("malformed record header line {trimmed:?}")),
            }
        }
    }

    /// Scans forward to the next version line (stashing it for the following
    /// call) and reports the damage that triggered the scan.
    fn resync(&mut self, message: String) -> PipelineError {
        loop {
            match self.read_line() {
                Ok(Some(line)) => {
                    let trimmed = line.trim_end_matches(['\r', '\n']);
                    if trimmed.starts_with("WARC/") {
                        self.pending_version = Some(trimmed.to_string());
                        break;
                    }
                }
                Ok(None) | Err(_) => {
                    self.done = true;
                    break;
                }
            }
        }
        PipelineError::ArchiveLoadFailed(message)
    }

    /// Reads one raw line, `None` at end of input.
    fn read_line(&mut self) -> std::io::Result<Option<String>> {
        let mut buf = Vec::new();
        let n = self.input.read_until(b'\n', &mut buf)?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }
}
