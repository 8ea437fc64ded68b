// tests/integration_test.rs

//! End-to-end scenarios: a local object store stands in for S3, real
//! archives flow through the prefetch cache, demultiplexer, worker pool and
//! sink, and the finished artifact is decoded and checked.

mod support;

use std::sync::Arc;
use support::TestRecord;
use warcpipe::core::ingest::cache::{PrefetchCache, PrefetchConfig};
use warcpipe::core::ingest::{Ingestor, WarcIngestor};
use warcpipe::core::index::parse_index;
use warcpipe::core::processors::Processor;
use warcpipe::core::record::OutputRow;
use warcpipe::core::sink::OutputSink;
use warcpipe::core::storage::{FsObjectStore, StorageDescriptor};
use warcpipe::pipeline::PipelineDriver;

struct Scenario {
    dir: tempfile::TempDir,
    index: String,
}

impl Scenario {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            index: String::new(),
        }
    }

    fn archive(&mut self, name: &str, bytes: &[u8]) -> &mut Self {
        support::write_archive(self.dir.path(), name, bytes);
        self.index.push_str(name);
        self.index.push('\n');
        self
    }

    fn index_line(&mut self, line: &str) -> &mut Self {
        self.index.push_str(line);
        self.index.push('\n');
        self
    }

    fn ingestor(&self, max_cache_len: usize) -> Box<dyn Ingestor> {
        let locators = parse_index(&self.index).unwrap();
        let store = Arc::new(FsObjectStore::new(self.dir.path()));
        let cache = PrefetchCache::spawn(
            locators,
            store,
            PrefetchConfig {
                max_cache_len,
                scratch_dir: self.dir.path().to_path_buf(),
                fetch_retries: 3,
                cache_full_backoff: std::time::Duration::from_millis(25),
            },
        );
        Box::new(WarcIngestor::new(cache, false))
    }

    /// Runs the full pipeline and returns the decoded artifact rows.
    async fn run(&self, processor: Processor, threads: usize) -> Vec<OutputRow> {
        let out = self.dir.path().join("artifact");
        let sink = Arc::new(
            OutputSink::open(Some(StorageDescriptor::File {
                path: out.to_str().unwrap().to_string(),
            }))
            .unwrap(),
        );
        let driver = PipelineDriver::new(processor, sink, threads);
        driver.run(self.ingestor(4)).await.unwrap();
        support::decode_artifact(&out)
    }
}

/// S1: one archive, three response records, copy processor. A single worker
/// keeps the output in archive order.
#[tokio::test]
async fn test_basic_three_record_archive() {
    let mut scenario = Scenario::new();
    scenario.archive(
        "a.warc.gz",
        &support::build_warc_gz(&support::basic_records()),
    );

    let rows = scenario.run(Processor::Copy, 1).await;
    assert_eq!(rows.len(), 3);

    let expected = [
        ("http://foo.com", r#"{"first":1}"#),
        ("http://bar.com", r#"{"second":2}"#),
        ("http://baz.com", r#"{"third":3}"#),
    ];
    for (row, (uri, content)) in rows.iter().zip(expected) {
        assert_eq!(row["uri"], serde_json::json!(uri));
        assert_eq!(row["content"], serde_json::json!(content));
    }
}

/// S2: a non-response record interleaved between responses is skipped
/// without an error row.
#[tokio::test]
async fn test_non_response_records_are_skipped() {
    let records: Vec<TestRecord> = vec![
        ("http://foo.com", r#"{"first":1}"#, "response"),
        ("http://bar.com", r#"{"second":2}"#, "metadata"),
        ("http://baz.com", r#"{"third":3}"#, "response"),
    ];
    let mut scenario = Scenario::new();
    scenario.archive("a.warc.gz", &support::build_warc_gz(&records));

    let rows = scenario.run(Processor::Copy, 1).await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["uri"], serde_json::json!("http://foo.com"));
    assert_eq!(rows[1]["uri"], serde_json::json!("http://baz.com"));
    assert!(rows.iter().all(|row| !row.contains_key("error")));
}

/// S3: 24 index entries over the same archive yield 72 output lines.
#[tokio::test]
async fn test_multi_archive_index() {
    let mut scenario = Scenario::new();
    support::write_archive(
        scenario.dir.path(),
        "a.warc.gz",
        &support::build_warc_gz(&support::basic_records()),
    );
    for _ in 0..24 {
        scenario.index_line("a.warc.gz");
    }

    let rows = scenario.run(Processor::Copy, 8).await;
    assert_eq!(rows.len(), 72);
}

/// S5: an archive that fails validation and recompression is skipped; the
/// second archive's records still come through.
#[tokio::test]
async fn test_corrupted_archive_is_skipped() {
    let mut scenario = Scenario::new();
    scenario.archive("bad.warc", b"complete nonsense, nothing recoverable");
    scenario.archive(
        "good.warc.gz",
        &support::build_warc_gz(&support::basic_records()),
    );

    let rows = scenario.run(Processor::Copy, 4).await;
    assert_eq!(rows.len(), 3);
}

/// S6: a processor failure on one record becomes one error row; the other
/// record still produces a normal row and the run finishes cleanly.
#[tokio::test]
async fn test_worker_failure_isolation() {
    let records: Vec<TestRecord> = vec![
        ("http://rt.example/broken", "no score markup here at all", "response"),
        (
            "http://rt.example/movie",
            r#"<html><score-board audiencescore="89" tomatometerscore="97"></score-board></html>"#,
            "response",
        ),
    ];
    let mut scenario = Scenario::new();
    scenario.archive("a.warc.gz", &support::build_warc_gz(&records));

    let rows = scenario.run(Processor::RottenTomatoes, 4).await;
    assert_eq!(rows.len(), 2);

    let errors: Vec<&OutputRow> = rows.iter().filter(|r| r.contains_key("error")).collect();
    assert_eq!(errors.len(), 1);
    assert!(!errors[0]["error"].as_str().unwrap().is_empty());

    let normal: Vec<&OutputRow> = rows.iter().filter(|r| !r.contains_key("error")).collect();
    assert_eq!(normal.len(), 1);
    assert_eq!(normal[0]["criticScore"], serde_json::json!("97"));
}

/// An empty index terminates the demultiplexer immediately.
#[tokio::test]
async fn test_empty_index_terminates_cleanly() {
    let scenario = Scenario::new();
    let rows = scenario.run(Processor::Copy, 4).await;
    assert!(rows.is_empty());
}

/// A single archive holding only non-response records yields no output but
/// still terminates cleanly.
#[tokio::test]
async fn test_archive_with_only_non_response_records() {
    let records: Vec<TestRecord> = vec![
        ("http://foo.com", "meta", "metadata"),
        ("http://bar.com", "info", "warcinfo"),
    ];
    let mut scenario = Scenario::new();
    scenario.archive("a.warc.gz", &support::build_warc_gz(&records));

    let rows = scenario.run(Processor::Copy, 2).await;
    assert!(rows.is_empty());
}

/// Every record carries its source archive's derived timestamp.
#[tokio::test]
async fn test_records_carry_archive_timestamp() {
    let mut scenario = Scenario::new();
    scenario.archive(
        "crawl-20210304235759-00004.warc.gz",
        &support::build_warc_gz(&support::basic_records()),
    );

    let rows = scenario.run(Processor::Copy, 1).await;
    assert_eq!(rows.len(), 3);
    let first_ts = rows[0]["ts"].as_f64().unwrap();
    assert!(first_ts > 0.0);
    assert!(rows.iter().all(|r| r["ts"].as_f64().unwrap() == first_ts));
}
