// tests/unit_index_test.rs

use chrono::{Local, TimeZone};
use warcpipe::core::PipelineError;
use warcpipe::core::index::{ArchiveLocator, parse_index};

#[test]
fn test_parse_key_only() {
    let locator = ArchiveLocator::parse("crawl/archive.warc.gz").unwrap();
    assert_eq!(locator.key, "crawl/archive.warc.gz");
    assert_eq!(locator.offset, 0);
    assert_eq!(locator.length, -1);
}

#[test]
fn test_parse_key_and_offset() {
    let locator = ArchiveLocator::parse("crawl/archive.warc.gz 4096").unwrap();
    assert_eq!(locator.offset, 4096);
    assert_eq!(locator.length, -1);
}

#[test]
fn test_parse_key_offset_length() {
    let locator = ArchiveLocator::parse("crawl/archive.warc.gz 4096 1024\n").unwrap();
    assert_eq!(locator.offset, 4096);
    assert_eq!(locator.length, 1024);
}

#[test]
fn test_parse_rejects_empty_line() {
    assert!(matches!(
        ArchiveLocator::parse(""),
        Err(PipelineError::MalformedIndexLine(_))
    ));
}

#[test]
fn test_parse_rejects_extra_tokens() {
    assert!(matches!(
        ArchiveLocator::parse("key 1 2 3"),
        Err(PipelineError::MalformedIndexLine(_))
    ));
}

#[test]
fn test_parse_rejects_non_integer_offset() {
    assert!(matches!(
        ArchiveLocator::parse("key abc"),
        Err(PipelineError::MalformedIndexLine(_))
    ));
}

#[test]
fn test_parse_rejects_negative_offset() {
    assert!(matches!(
        ArchiveLocator::parse("key -5"),
        Err(PipelineError::MalformedIndexLine(_))
    ));
}

#[test]
fn test_parse_rejects_zero_length() {
    assert!(matches!(
        ArchiveLocator::parse("key 0 0"),
        Err(PipelineError::MalformedIndexLine(_))
    ));
}

#[test]
fn test_parse_index_skips_blank_lines() {
    let locators = parse_index("a.warc.gz\n\nb.warc.gz 10\n").unwrap();
    assert_eq!(locators.len(), 2);
    assert_eq!(locators[1].offset, 10);
}

#[test]
fn test_parse_index_fails_on_any_malformed_line() {
    assert!(parse_index("a.warc.gz\nnot a number here oops\n").is_err());
}

#[test]
fn test_timestamp_from_crawl_key() {
    let locator = ArchiveLocator::new(
        "crawl-data/CC-MAIN-2021/CC-MAIN-20210304235759-20210305025759-00004.warc.gz",
        0,
        -1,
    );
    let expected = Local
        .with_ymd_and_hms(2021, 3, 4, 23, 57, 59)
        .single()
        .unwrap()
        .timestamp() as f64;
    assert_eq!(locator.timestamp(), expected);
}

#[test]
fn test_timestamp_from_dated_path() {
    // Millisecond epochs round down to whole seconds.
    let locator = ArchiveLocator::new("2021/03/04/12/1614812400123_42", 0, -1);
    assert_eq!(locator.timestamp(), 1614812400.0);
}

#[test]
fn test_timestamp_prefers_crawl_key_probe() {
    let locator = ArchiveLocator::new("2021/03/04/12/20210304235759-00004_7", 0, -1);
    let expected = Local
        .with_ymd_and_hms(2021, 3, 4, 23, 57, 59)
        .single()
        .unwrap()
        .timestamp() as f64;
    assert_eq!(locator.timestamp(), expected);
}

#[test]
fn test_timestamp_defaults_to_zero() {
    let locator = ArchiveLocator::new("some/unremarkable/key.warc.gz", 0, -1);
    assert_eq!(locator.timestamp(), 0.0);
}

#[test]
fn test_timestamp_matches_local_wall_clock_for_random_keys() {
    use rand::{Rng, SeedableRng, rngs::SmallRng};

    let mut rng = SmallRng::seed_from_u64(42);
    for _ in 0..20 {
        let (year, month, day) = (
            rng.gen_range(2015..2022),
            rng.gen_range(1..=12),
            rng.gen_range(1..=28),
        );
        let (hour, minute, second) = (
            rng.gen_range(0..24),
            rng.gen_range(0..60),
            rng.gen_range(0..60),
        );
        let key = format!("{year}{month:02}{day:02}{hour:02}{minute:02}{second:02}-00001.warc.gz");
        let expected = Local
            .with_ymd_and_hms(year, month, day, hour, minute, second)
            .earliest()
            .map(|dt| dt.timestamp() as f64)
            .unwrap_or(0.0);
        assert_eq!(ArchiveLocator::new(&key, 0, -1).timestamp(), expected);
    }
}
