// src/core/warc/checker.rs

//! Validation and recompression of freshly downloaded archives. A damaged
//! archive is rewritten into a well-formed one where possible; otherwise the
//! caller discards it, so a bad download never blocks the pipeline.

use crate::core::errors::PipelineError;
use crate::core::warc::reader::{WarcReader, WarcRecord};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Returns true iff the archive is readable end-to-end.
pub fn check(path: &Path) -> bool {
    let mut reader = match WarcReader::open(path) {
        Ok(r) => r,
        Err(_) => return false,
    };
    loop {
        match reader.next_record() {
            Ok(Some(_)) => {}
            Ok(None) => return true,
            Err(_) => return false,
        }
    }
}

/// Rewrites a damaged archive into a well-formed one, re-reading tolerantly
/// and emitting each recovered record as its own gzip member. Fails when
/// nothing at all can be recovered.
pub fn recompress(src: &Path, dst: &Path) -> Result<u64, PipelineError> {
    let mut reader = WarcReader::open(src)?;
    let mut out = BufWriter::new(File::create(dst)?);
    let mut recovered = 0u64;
    loop {
        match reader.next_record() {
            Ok(Some(record)) => {
                write_member(&mut out, &record)?;
                recovered += 1;
            }
            Ok(None) => break,
            Err(e) => {
                debug!("dropping damaged region while recompressing: {e}");
            }
        }
    }
    if recovered == 0 {
        return Err(PipelineError::ArchiveCheckFailed(format!(
            "no records recovered from {}",
            src.display()
        )));
    }
    out.flush()?;
    Ok(recovered)
}

/// The post-download policy: pass a valid archive through untouched,
/// recompress a damaged one into `<path>.tmp` and atomically move it over
/// the original. A recompression failure surfaces to the caller, which
/// discards the entry with a warning.
pub fn validate_or_recompress(path: &Path) -> Result<(), PipelineError> {
    if check(path) {
        return Ok(());
    }
    let tmp = PathBuf::from(format!("{}.tmp", path.display()));
    recompress(path, &tmp)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn write_member<W: Write>(out: &mut W, record: &WarcRecord) -> Result<(), PipelineError> {
    let mut encoder = GzEncoder::new(out, Compression::new(9));
    write!(encoder, "{}\r\n", record.version)?;
    for (name, value) in &record.headers {
        write!(encoder, "{name}: {value}\r\n")?;
    }
    encoder.write_all(b"\r\n")?;
    encoder.write_all(&record.content)?;
    encoder.write_all(b"\r\n\r\n")?;
    encoder.finish()?;
    Ok(())
}
