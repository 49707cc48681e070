//! Integration tests for the S3/MinIO-backed blob store.
//!
//! These tests require a live MinIO instance on `localhost:9000`. Start one
//! with `docker run -p 9000:9000 minio/minio server /data` (or the project's
//! `docker-compose`). All tests are `#[ignore]`d so they never run in CI
//! without a live service:
//!
//! `cargo test --package idp-blob-store --test s3_integration_test -- --ignored --nocapture`

use idp_blob_store::{BlobStore, S3BlobStore, S3Config};

async fn is_minio_available() -> bool {
    tokio::net::TcpStream::connect("127.0.0.1:9000").await.is_ok()
}

fn test_config(prefix: &str) -> S3Config {
    S3Config {
        bucket: "idp-documents".to_string(),
        region: "us-east-1".to_string(),
        endpoint: Some("http://localhost:9000".to_string()),
        access_key_id: "minioadmin".to_string(),
        secret_access_key: "minioadmin".to_string(),
        prefix: prefix.to_string(),
    }
}

#[tokio::test]
#[ignore] // Requires MinIO running on localhost:9000
async fn put_get_exists_delete_round_trip() {
    if !is_minio_available().await {
        eprintln!("MinIO not available on 127.0.0.1:9000, skipping put_get_exists_delete_round_trip");
        return;
    }

    let store = S3BlobStore::new(test_config("test/")).await.expect("failed to create S3 blob store");

    let key = "doc-1/pages/1/text.md";
    let body = b"page one text";

    let full_key = store.put(key, body, "text/markdown").await.expect("put failed");
    assert_eq!(full_key, "test/doc-1/pages/1/text.md");

    let fetched = store.get(key).await.expect("get failed");
    assert_eq!(fetched, body);

    assert!(store.exists(key).await.expect("exists failed"));

    store.delete(key).await.expect("delete failed");
    assert!(!store.exists(key).await.expect("exists failed"));
}

#[tokio::test]
#[ignore] // Requires MinIO running on localhost:9000
async fn list_returns_every_key_under_a_prefix() {
    if !is_minio_available().await {
        eprintln!("MinIO not available on 127.0.0.1:9000, skipping list_returns_every_key_under_a_prefix");
        return;
    }

    let store = S3BlobStore::new(test_config("test-list/")).await.expect("failed to create S3 blob store");

    let keys = ["doc-1/sections/1/result.json", "doc-1/sections/2/result.json"];
    for key in keys {
        store.put(key, b"{}", "application/json").await.expect("put failed");
    }

    let listed = store.list("doc-1/sections/").await.expect("list failed");
    assert_eq!(listed.len(), keys.len());

    for key in keys {
        store.delete(key).await.expect("cleanup delete failed");
    }
}

#[tokio::test]
#[ignore] // Requires MinIO running on localhost:9000
async fn get_of_a_missing_key_is_not_found() {
    if !is_minio_available().await {
        eprintln!("MinIO not available on 127.0.0.1:9000, skipping get_of_a_missing_key_is_not_found");
        return;
    }

    let store = S3BlobStore::new(test_config("test-missing/")).await.expect("failed to create S3 blob store");

    let err = store.get("does/not/exist.json").await.unwrap_err();
    assert!(matches!(err, idp_blob_store::BlobError::NotFound(_)));
}
