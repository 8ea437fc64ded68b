// tests/unit_storage_test.rs

use warcpipe::core::PipelineError;
use warcpipe::core::index::ArchiveLocator;
use warcpipe::core::storage::{FsObjectStore, ObjectStore, StorageDescriptor};

#[test]
fn test_descriptor_parses_file_uri() {
    let descriptor = StorageDescriptor::parse("file:///tmp/out").unwrap();
    assert_eq!(
        descriptor,
        StorageDescriptor::File {
            path: "/tmp/out".to_string()
        }
    );
}

#[test]
fn test_descriptor_parses_s3_uri() {
    let descriptor = StorageDescriptor::parse("s3://us-east-1.my-bucket/results/out").unwrap();
    assert_eq!(
        descriptor,
        StorageDescriptor::S3 {
            region: "us-east-1".to_string(),
            bucket: "my-bucket".to_string(),
            path: "results/out".to_string()
        }
    );
}

#[test]
fn test_descriptor_rejects_unknown_scheme() {
    assert!(matches!(
        StorageDescriptor::parse("ftp://host/path"),
        Err(PipelineError::BadOutputUri(_))
    ));
}

#[test]
fn test_descriptor_rejects_s3_uri_without_region() {
    assert!(matches!(
        StorageDescriptor::parse("s3://just-a-bucket"),
        Err(PipelineError::BadOutputUri(_))
    ));
}

#[tokio::test]
async fn test_fs_fetch_whole_object() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("obj"), b"0123456789").unwrap();
    let store = FsObjectStore::new(dir.path());

    let dest = dir.path().join("copy");
    let locator = ArchiveLocator::new("obj", 0, -1);
    let written = store.fetch_to(&locator, &dest).await.unwrap();
    assert_eq!(written, 10);
    assert_eq!(std::fs::read(&dest).unwrap(), b"0123456789");
}

#[tokio::test]
async fn test_fs_fetch_range() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("obj"), b"0123456789").unwrap();
    let store = FsObjectStore::new(dir.path());

    let dest = dir.path().join("copy");
    let locator = ArchiveLocator::new("obj", 2, 4);
    store.fetch_to(&locator, &dest).await.unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), b"2345");
}

#[tokio::test]
async fn test_fs_fetch_offset_to_end() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("obj"), b"0123456789").unwrap();
    let store = FsObjectStore::new(dir.path());

    let dest = dir.path().join("copy");
    let locator = ArchiveLocator::new("obj", 7, -1);
    store.fetch_to(&locator, &dest).await.unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), b"789");
}

#[tokio::test]
async fn test_fs_fetch_missing_key_is_not_transport() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsObjectStore::new(dir.path());
    let locator = ArchiveLocator::new("no-such-object", 0, -1);
    let err = store
        .fetch_to(&locator, &dir.path().join("copy"))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Storage(_)));
}

#[tokio::test]
async fn test_fs_put_copies_into_root() {
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("artifact");
    std::fs::write(&local, b"payload").unwrap();
    let store = FsObjectStore::new(dir.path().join("remote"));

    let written = store.put(&local, "results/out").await.unwrap();
    assert_eq!(written, 7);
    assert_eq!(
        std::fs::read(dir.path().join("remote/results/out")).unwrap(),
        b"payload"
    );
}
