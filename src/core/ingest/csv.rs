// src/core/ingest/csv.rs

//! CSV front-end: one record per row, with `uri` and `ts` taken from named
//! columns and the whole row carried as the record content.

use crate::core::errors::PipelineError;
use crate::core::ingest::Ingestor;
use crate::core::record::Record;
use async_trait::async_trait;
use csv::StringRecord;
use std::fs::File;
use std::path::Path;
use tracing::warn;

pub struct CsvIngestor {
    reader: csv::Reader<File>,
    headers: StringRecord,
    uri_col: usize,
    ts_col: usize,
}

impl CsvIngestor {
    /// Opens a CSV file whose first row is a header. The `uri` and `ts`
    /// columns are required; their absence is a configuration fault.
    pub fn new(path: &Path) -> Result<Self, PipelineError> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();
        let column = |name: &str| {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                PipelineError::MalformedIndexLine(format!(
                    "CSV input {} is missing required column '{name}'",
                    path.display()
                ))
            })
        };
        let uri_col = column("uri")?;
        let ts_col = column("ts")?;
        Ok(Self {
            reader,
            headers,
            uri_col,
            ts_col,
        })
    }

    /// Re-encodes the row as a JSON object keyed by the header names.
    fn row_content(&self, row: &StringRecord) -> Result<String, PipelineError> {
        let mut object = serde_json::Map::new();
        for (name, value) in self.headers.iter().zip(row.iter()) {
            object.insert(
                name.to_string(),
                serde_json::Value::String(value.to_string()),
            );
        }
        Ok(serde_json::to_string(&object)?)
    }
}

#[async_trait]
impl Ingestor for CsvIngestor {
    async fn next_record(&mut self) -> Result<Option<Record>, PipelineError> {
        let mut row = StringRecord::new();
        if !self.reader.read_record(&mut row)? {
            return Ok(None);
        }

        let uri = row.get(self.uri_col).unwrap_or_default().to_string();
        let ts_raw = row.get(self.ts_col).unwrap_or_default();
        // Every record carries a finite ts; an unparseable column value is
        // demoted to 0.0 rather than killing the run.
        let ts = ts_raw.parse::<f64>().unwrap_or_else(|_| {
            warn!("Row with uri {uri} has non-numeric ts {ts_raw:?}");
            0.0
        });
        let content = self.row_content(&row)?;
        Ok(Some(Record::new(uri, ts, content)))
    }
}
