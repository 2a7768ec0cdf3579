//! Blob service REST calls against a mocked storage endpoint.

mod common;

use std::sync::Arc;

use bytes::Bytes;
use common::{StaticKeys, config};
use nba_refresh::archive::ArchiveWriter;
use nba_refresh::config::BlobTarget;
use nba_refresh::infra::blob::{AzureBlobConnector, AzureBlobStore, BlobStore, ContainerStatus};
use nba_refresh::refresh::{Pipeline, RefreshOutcome};
use nba_refresh::snapshot::FeedSnapshot;
use serde_json::json;
use wiremock::matchers::{body_string, header, header_exists, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// "key" in base64.
fn shared_key_conn(server: &MockServer) -> String {
    format!(
        "DefaultEndpointsProtocol=http;AccountName=devacct;AccountKey=a2V5;BlobEndpoint={}/devacct",
        server.uri()
    )
}

#[tokio::test]
async fn test_create_container() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/devacct/nba-datalake"))
        .and(query_param("restype", "container"))
        .and(header_exists("x-ms-version"))
        .and(header_exists("x-ms-date"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let store = AzureBlobStore::from_connection_string(&shared_key_conn(&server)).unwrap();
    assert_eq!(
        store.ensure_container("nba-datalake").await.unwrap(),
        ContainerStatus::Created
    );
}

#[tokio::test]
async fn test_existing_container() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/devacct/nba-datalake"))
        .respond_with(
            ResponseTemplate::new(409).insert_header("x-ms-error-code", "ContainerAlreadyExists"),
        )
        .mount(&server)
        .await;

    let store = AzureBlobStore::from_connection_string(&shared_key_conn(&server)).unwrap();
    assert_eq!(
        store.ensure_container("nba-datalake").await.unwrap(),
        ContainerStatus::AlreadyExists
    );
}

#[tokio::test]
async fn test_container_permission_error() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ms-error-code", "AuthorizationPermissionMismatch"),
        )
        .mount(&server)
        .await;

    let store = AzureBlobStore::from_connection_string(&shared_key_conn(&server)).unwrap();
    let err = store.ensure_container("nba-datalake").await.unwrap_err().to_string();
    assert!(err.contains("AuthorizationPermissionMismatch"), "{err}");
}

#[tokio::test]
async fn test_put_blob() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path_regex(r"^/devacct/nba-datalake/raw-data(/|%2F)nba_player_data\.jsonl$"))
        .and(header("x-ms-blob-type", "BlockBlob"))
        .and(body_string("{\"id\": 1}"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let store = AzureBlobStore::from_connection_string(&shared_key_conn(&server)).unwrap();
    store
        .put_blob(
            "nba-datalake",
            "raw-data/nba_player_data.jsonl",
            Bytes::from_static(b"{\"id\": 1}"),
            "application/x-ndjson",
        )
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let auth = requests[0].headers.get("authorization").unwrap().to_str().unwrap();
    assert!(auth.starts_with("SharedKey devacct:"), "{auth}");
}

#[tokio::test]
async fn test_put_blob_with_sas() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path_regex(r"/nba-datalake/raw-data(/|%2F)nba_player_data\.jsonl$"))
        .and(query_param("sv", "2021-08-06"))
        .and(query_param("sig", "abc"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let conn = format!(
        "BlobEndpoint={}/sasacct;SharedAccessSignature=sv=2021-08-06&sig=abc",
        server.uri()
    );
    let store = AzureBlobStore::from_connection_string(&conn).unwrap();
    store
        .put_blob(
            "nba-datalake",
            "raw-data/nba_player_data.jsonl",
            Bytes::from_static(b"{}"),
            "application/x-ndjson",
        )
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_put_blob_failure() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(403).insert_header("x-ms-error-code", "AuthenticationFailed"))
        .mount(&server)
        .await;

    let store = AzureBlobStore::from_connection_string(&shared_key_conn(&server)).unwrap();
    let err = store
        .put_blob("c", "b.jsonl", Bytes::new(), "application/x-ndjson")
        .await
        .unwrap_err()
        .to_string();
    assert!(err.contains("AuthenticationFailed"), "{err}");
}

#[tokio::test]
async fn test_archive_writer_over_rest() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/devacct/nba-datalake"))
        .respond_with(
            ResponseTemplate::new(409).insert_header("x-ms-error-code", "ContainerAlreadyExists"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/devacct/nba-datalake/raw-data(/|%2F)nba_player_data\.jsonl$"))
        .and(body_string("{\"id\": 1, \"name\": \"Luka Don\\u010di\\u0107\"}\n{\"id\": 2}"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let conn = shared_key_conn(&server);
    let keys = StaticKeys::new(&[("StorageConnectionString", conn.as_str())]);
    let writer = ArchiveWriter::new(keys, Arc::new(AzureBlobConnector));
    let snapshot = FeedSnapshot::new(vec![json!({"id": 1, "name": "Luka Dončić"}), json!({"id": 2})]);

    let report = writer.archive(&snapshot, &BlobTarget::default()).await.unwrap();
    assert_eq!(report.records, 2);
    assert_eq!(report.container, Some(ContainerStatus::AlreadyExists));
}

#[tokio::test]
async fn test_unparseable_connection_string_fails_run() {
    let feed = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"[{"id":1}]"#))
        .mount(&feed)
        .await;

    let pipeline = Pipeline::new(
        &config(&format!("{}/api", feed.uri())),
        StaticKeys::standard(),
        Arc::new(AzureBlobConnector),
    );

    assert!(matches!(
        pipeline.run().await,
        RefreshOutcome::ArchiveFailed(nba_refresh::RefreshError::UploadFailed(_))
    ));
}
