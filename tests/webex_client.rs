//! Webex client and bulk pipeline against a stub Webex API.

mod common;

use common::{spawn_paging_stub, spawn_stub};
use recording_migrator::migration::{Migrator, TransferPolicy};
use recording_migrator::storage::{stored_keys, LocalFolderStore};
use recording_migrator::webex::{
    AccessToken, ProviderError, RecordingPeriod, RecordingProvider, WebexClient,
};
use std::sync::Arc;

fn period() -> RecordingPeriod {
    RecordingPeriod::parse("2022-05-01", "2022-05-31").unwrap()
}

fn token() -> AccessToken {
    AccessToken::new("stub-token")
}

#[tokio::test]
async fn test_exchange_code_sets_expiry() {
    let stub = spawn_stub().await;
    let client = WebexClient::new(&stub.config());

    let token = client.exchange_code("good").await.unwrap();
    assert_eq!(token.secret(), "stub-token");
    assert!(token.expires_at().is_some());
    assert!(!token.is_expired());
}

#[tokio::test]
async fn test_exchange_code_failures() {
    let stub = spawn_stub().await;
    let client = WebexClient::new(&stub.config());

    let err = client.exchange_code("bad").await.unwrap_err();
    assert_eq!(err.status(), Some(400));

    let err = client.exchange_code("tokenless").await.unwrap_err();
    assert!(matches!(
        err,
        ProviderError::MissingField {
            field: "access_token",
            ..
        }
    ));
}

#[tokio::test]
async fn test_list_people_follows_link_header() {
    let stub = spawn_stub().await;
    let client = WebexClient::new(&stub.config());

    let people = client.list_people(&token()).await.unwrap();
    let ids: Vec<&str> = people.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "p2", "p3"]);
}

#[tokio::test]
async fn test_list_people_stops_on_link_cycle() {
    let stub = spawn_paging_stub("{base}/v1/people?max=100").await;
    let client = WebexClient::new(&stub.config());

    let people = client.list_people(&token()).await.unwrap();
    let ids: Vec<&str> = people.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "p2"]);
}

#[tokio::test]
async fn test_list_people_refuses_foreign_link() {
    let stub = spawn_paging_stub("http://attacker.invalid/v1/people?cursor=3").await;
    let client = WebexClient::new(&stub.config());

    let err = client.list_people(&token()).await.unwrap_err();
    assert!(matches!(err, ProviderError::InvalidUrl(_)));
}

#[tokio::test]
async fn test_list_sites() {
    let stub = spawn_stub().await;
    let client = WebexClient::new(&stub.config());

    let sites = client.list_sites(&token()).await.unwrap();
    assert_eq!(sites.len(), 2);
    assert!(sites[1].default);
    assert_eq!(sites[1].site_url, "acme.webex.com");
}

#[tokio::test]
async fn test_list_recordings_paginates_and_fills_host() {
    let stub = spawn_stub().await;
    let client = WebexClient::new(&stub.config());

    let recordings = client
        .list_recordings(&token(), &period(), "acme.webex.com", "jane@example.com")
        .await
        .unwrap();

    let ids: Vec<&str> = recordings.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["r1", "r2"]);
    assert!(recordings.iter().all(|r| r.host_email == "jane@example.com"));
}

#[tokio::test]
async fn test_unauthorized_host_lists_nothing() {
    let stub = spawn_stub().await;
    let client = WebexClient::new(&stub.config());

    let recordings = client
        .list_recordings(&token(), &period(), "acme.webex.com", "locked@example.com")
        .await
        .unwrap();
    assert!(recordings.is_empty());
}

#[tokio::test]
async fn test_host_details_not_found_is_an_error() {
    let stub = spawn_stub().await;
    let client = WebexClient::new(&stub.config());

    let details = client.host_details(&token(), "p1").await.unwrap();
    assert_eq!(details.primary_email(), Some("jane@example.com"));

    let err = client.host_details(&token(), "nobody").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_details_and_download() {
    let stub = spawn_stub().await;
    let client = WebexClient::new(&stub.config());

    let details = client
        .recording_details(&token(), "r1", "jane@example.com")
        .await
        .unwrap();
    let link = details.download_link().unwrap().to_string();
    assert!(link.ends_with("/download/r1"));

    let payload = client.download(&link).await.unwrap();
    assert_eq!(&payload[..], b"video bytes of r1");
}

#[tokio::test]
async fn test_delete_reports_status_class() {
    let stub = spawn_stub().await;
    let client = WebexClient::new(&stub.config());

    assert!(client.delete_recording(&token(), "r1", "jane@example.com").await);
    assert!(!client.delete_recording(&token(), "r2", "jane@example.com").await);
    assert_eq!(
        stub.deletes(),
        vec![
            ("r1".to_string(), "jane@example.com".to_string()),
            ("r2".to_string(), "jane@example.com".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_delete_transport_error_is_false() {
    let mut config = spawn_stub().await.config();
    config.base_url = "http://127.0.0.1:1/v1".to_string();
    let client = WebexClient::new(&config);

    assert!(!client.delete_recording(&token(), "r1", "jane@example.com").await);
}

#[tokio::test]
async fn test_bulk_migration_into_local_folder() {
    let stub = spawn_stub().await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("Earlier copy---r2.mp4"), b"old").unwrap();

    let migrator = Migrator::new(
        Arc::new(WebexClient::new(&stub.config())),
        Arc::new(LocalFolderStore::new(dir.path().to_path_buf())),
        TransferPolicy::Migrate,
    );

    let summary = migrator
        .run_bulk(&token(), &period(), "acme.webex.com")
        .await
        .unwrap();

    assert_eq!(summary.migrated_ids(), vec!["r1"]);
    assert!(summary.failed.is_empty());
    assert_eq!(summary.deleted, vec!["r1".to_string()]);
    assert_eq!(
        summary.migrated[0].filename,
        "Jane Doe-2022-05-01T10:00:00Z---r1.mp4"
    );

    let content =
        std::fs::read(dir.path().join("Jane Doe-2022-05-01T10:00:00Z---r1.mp4")).unwrap();
    assert_eq!(content, b"video bytes of r1");

    let store = LocalFolderStore::new(dir.path().to_path_buf());
    let keys = stored_keys(&store).await.unwrap();
    assert!(keys.contains("r1"));
    assert!(keys.contains("r2"));

    assert_eq!(
        stub.deletes(),
        vec![("r1".to_string(), "jane@example.com".to_string())]
    );
}
