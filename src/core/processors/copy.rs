// src/core/processors/copy.rs

//! The identity transformation: every record becomes one row carrying its
//! uri, timestamp and content untouched.

use crate::core::errors::PipelineError;
use crate::core::record::{OutputRow, Record};
use serde_json::{Value, json};

pub fn process(record: &Record) -> Result<Vec<OutputRow>, PipelineError> {
    let mut row = OutputRow::new();
    row.insert("uri".to_string(), Value::String(record.uri.clone()));
    row.insert("ts".to_string(), json!(record.ts));
    row.insert("content".to_string(), Value::String(record.content.clone()));
    Ok(vec![row])
}
