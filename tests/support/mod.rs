// tests/support/mod.rs

//! Shared fixtures: in-memory WARC construction and artifact decoding.

#![allow(dead_code)]

use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;
use std::path::Path;
use warcpipe::core::record::OutputRow;
use warcpipe::core::sink;

/// One test record: (target uri, content, record type).
pub type TestRecord<'a> = (&'a str, &'a str, &'a str);

/// The three-record fixture used by the basic end-to-end scenarios.
pub fn basic_records() -> Vec<TestRecord<'static>> {
    vec![
        ("http://foo.com", r#"{"first":1}"#, "response"),
        ("http://bar.com", r#"{"second":2}"#, "response"),
        ("http://baz.com", r#"{"third":3}"#, "response"),
    ]
}

fn serialize_record(uri: &str, content: &str, rec_type: &str) -> Vec<u8> {
    let mut out = Vec::new();
    write!(out, "WARC/1.0\r\n").unwrap();
    write!(out, "WARC-Type: {rec_type}\r\n").unwrap();
    write!(out, "WARC-Target-URI: {uri}\r\n").unwrap();
    write!(out, "Content-Length: {}\r\n", content.len()).unwrap();
    write!(out, "\r\n").unwrap();
    out.extend_from_slice(content.as_bytes());
    out.extend_from_slice(b"\r\n\r\n");
    out
}

/// Builds an archive with one gzip member per record, the way crawl
/// archives are laid out.
pub fn build_warc_gz(records: &[TestRecord]) -> Vec<u8> {
    let mut out = Vec::new();
    for (uri, content, rec_type) in records {
        let mut encoder = GzEncoder::new(&mut out, Compression::default());
        encoder
            .write_all(&serialize_record(uri, content, rec_type))
            .unwrap();
        encoder.finish().unwrap();
    }
    out
}

/// Builds an uncompressed archive.
pub fn build_warc_plain(records: &[TestRecord]) -> Vec<u8> {
    let mut out = Vec::new();
    for (uri, content, rec_type) in records {
        out.extend_from_slice(&serialize_record(uri, content, rec_type));
    }
    out
}

/// Writes an archive file under `dir` and returns its key.
pub fn write_archive(dir: &Path, name: &str, bytes: &[u8]) -> String {
    std::fs::write(dir.join(name), bytes).unwrap();
    name.to_string()
}

/// Decodes every line of a finished artifact back into rows.
pub fn decode_artifact(path: &Path) -> Vec<OutputRow> {
    let contents = std::fs::read_to_string(path).unwrap();
    contents
        .lines()
        .map(|line| sink::decode_line(line).unwrap())
        .collect()
}
