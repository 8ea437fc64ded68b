// src/core/record.rs

//! The normalized unit flowing through the pipeline, and the opaque row
//! shape produced by processors.

/// An opaque, JSON-serializable mapping produced by a processor. The sink
/// never inspects it beyond serialization.
pub type OutputRow = serde_json::Map<String, serde_json::Value>;

/// One normalized record: a URI, the wall-clock timestamp of its source
/// archive, and its content.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub uri: String,
    pub ts: f64,
    pub content: String,
}

impl Record {
    pub fn new(uri: impl Into<String>, ts: f64, content: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ts,
            content: content.into(),
        }
    }

    /// Builds a record from raw content bytes. Invalid UTF-8 sequences are
    /// replaced rather than rejected, so every archived payload produces a
    /// record.
    pub fn from_bytes(uri: impl Into<String>, ts: f64, content: &[u8]) -> Self {
        Self {
            uri: uri.into(),
            ts,
            content: String::from_utf8_lossy(content).into_owned(),
        }
    }
}

/// Builds the single-field error row the pipeline emits when a processor
/// fails on a record.
pub fn error_row(message: impl Into<String>) -> OutputRow {
    let mut row = OutputRow::new();
    row.insert(
        "error".to_string(),
        serde_json::Value::String(message.into()),
    );
    row
}
