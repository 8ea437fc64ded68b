// tests/unit_ingest_test.rs

use std::str::FromStr;
use warcpipe::core::PipelineError;
use warcpipe::core::ingest::{BtcIngestor, CsvIngestor, Ingestor, IngestorKind};

#[test]
fn test_ingestor_selector() {
    assert_eq!(
        IngestorKind::from_str("warc-index").unwrap(),
        IngestorKind::WarcIndex
    );
    assert_eq!(
        IngestorKind::from_str("csv-file").unwrap(),
        IngestorKind::CsvFile
    );
    assert_eq!(IngestorKind::from_str("btc").unwrap(), IngestorKind::Btc);
    assert!(matches!(
        IngestorKind::from_str("kafka"),
        Err(PipelineError::UnknownIngestor(_))
    ));
}

#[tokio::test]
async fn test_csv_yields_one_record_per_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.csv");
    std::fs::write(
        &path,
        "uri,ts,label\nhttp://foo.com,100.5,first\nhttp://bar.com,200,second\n",
    )
    .unwrap();

    let mut ingestor = CsvIngestor::new(&path).unwrap();

    let first = ingestor.next_record().await.unwrap().unwrap();
    assert_eq!(first.uri, "http://foo.com");
    assert_eq!(first.ts, 100.5);
    let content: serde_json::Value = serde_json::from_str(&first.content).unwrap();
    assert_eq!(content["label"], serde_json::json!("first"));

    let second = ingestor.next_record().await.unwrap().unwrap();
    assert_eq!(second.uri, "http://bar.com");
    assert_eq!(second.ts, 200.0);

    assert!(ingestor.next_record().await.unwrap().is_none());
}

#[tokio::test]
async fn test_csv_requires_uri_and_ts_columns() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.csv");
    std::fs::write(&path, "uri,label\nhttp://foo.com,first\n").unwrap();
    assert!(matches!(
        CsvIngestor::new(&path),
        Err(PipelineError::MalformedIndexLine(_))
    ));
}

#[tokio::test]
async fn test_csv_demotes_bad_ts_to_zero() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.csv");
    std::fs::write(&path, "uri,ts\nhttp://foo.com,soon\n").unwrap();

    let mut ingestor = CsvIngestor::new(&path).unwrap();
    let record = ingestor.next_record().await.unwrap().unwrap();
    assert_eq!(record.ts, 0.0);
}

#[test]
fn test_btc_spec_parses_base_url_and_range() {
    assert!(BtcIngestor::from_spec("http://blocks.example/raw,100,110").is_ok());
}

#[test]
fn test_btc_spec_rejects_malformed_input() {
    for spec in [
        "http://blocks.example/raw",
        "http://blocks.example/raw,100",
        "http://blocks.example/raw,abc,110",
        "http://blocks.example/raw,100,110,extra",
    ] {
        assert!(
            matches!(
                BtcIngestor::from_spec(spec),
                Err(PipelineError::MalformedIndexLine(_))
            ),
            "spec {spec:?} should be rejected"
        );
    }
}
