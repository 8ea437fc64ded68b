// src/core/warc/mod.rs

//! A streaming reader, validator and recompressor for WARC web-crawl
//! archives.

pub mod checker;
pub mod reader;

pub use reader::{WarcReader, WarcRecord};

/// The record type carrying an archived HTTP response.
pub const RECORD_TYPE_RESPONSE: &str = "response";

/// The record header naming the archived URI.
pub const HEADER_TARGET_URI: &str = "WARC-Target-URI";
