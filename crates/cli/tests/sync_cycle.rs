mod common;

use common::{remote, sqlite_app};
use providers::fixed::StaticRemoteSource;
use quotebook_core::models::default_records;
use quotebook_core::sync::SyncOutcome;
use quotebook_core::{ConflictPolicy, Record, RecordSet};
use std::sync::Arc;
use storage::KeyValueStore;

#[tokio::test]
async fn remote_wins_cycle_overwrites_and_persists() {
    let temp = tempfile::tempdir().unwrap();
    let (app, local) = sqlite_app(temp.path()).await;
    let app = app.with_remote(Arc::new(StaticRemoteSource::new(remote(&[
        ("Learning never exhausts the mind.", "Server"),
        ("sunt aut facere repellat provident", "Server"),
    ]))));

    let outcome = app.sync_service(Some(ConflictPolicy::RemoteWins)).sync_once().await;
    assert!(outcome.changed(), "got {outcome:?}");

    let stored: RecordSet =
        serde_json::from_str(&local.get("quotes").await.unwrap().unwrap()).unwrap();
    assert_eq!(stored.len(), default_records().len() + 1);
    assert_eq!(
        stored.get(9),
        Some(&Record::new("Learning never exhausts the mind.", "Server"))
    );
    assert_eq!(
        stored.get(10),
        Some(&Record::new("sunt aut facere repellat provident", "Server"))
    );
}

#[tokio::test]
async fn keep_both_cycle_only_appends() {
    let temp = tempfile::tempdir().unwrap();
    let (app, _local) = sqlite_app(temp.path()).await;
    let app = app.with_remote(Arc::new(StaticRemoteSource::new(remote(&[
        ("Learning never exhausts the mind.", "Server"),
        ("qui est esse", "Server"),
    ]))));

    let outcome = app
        .sync_service(Some(ConflictPolicy::KeepBothIfNew))
        .sync_once()
        .await;
    let SyncOutcome::Applied(report) = outcome else {
        panic!("expected an applied sync");
    };
    assert_eq!((report.appended, report.replaced), (1, 0));

    let set = app.book.snapshot().await;
    assert_eq!(&set.as_slice()[..10], default_records().as_slice());
    assert_eq!(set.get(10), Some(&Record::new("qui est esse", "Server")));
}

#[tokio::test]
async fn failed_fetch_keeps_stored_blob_byte_identical() {
    let temp = tempfile::tempdir().unwrap();
    let (app, local) = sqlite_app(temp.path()).await;
    app.book.add("Local only", "Mine").await.unwrap();
    let before = local.get("quotes").await.unwrap().unwrap();

    let app = app.with_remote(Arc::new(StaticRemoteSource::failing("connection refused")));
    let outcome = app.sync_service(None).sync_once().await;

    assert!(matches!(outcome, SyncOutcome::FetchFailed(_)));
    assert_eq!(local.get("quotes").await.unwrap().unwrap(), before);
    assert!(app
        .book
        .snapshot()
        .await
        .contains(&Record::new("Local only", "Mine")));
}

#[tokio::test]
async fn synced_set_is_loaded_by_next_run() {
    let temp = tempfile::tempdir().unwrap();
    {
        let (app, _) = sqlite_app(temp.path()).await;
        let app = app.with_remote(Arc::new(StaticRemoteSource::new(remote(&[(
            "ea molestias quasi",
            "Server",
        )]))));
        assert!(app.sync_service(None).sync_once().await.changed());
    }
    let (reopened, _) = sqlite_app(temp.path()).await;
    assert!(reopened
        .book
        .snapshot()
        .await
        .contains(&Record::new("ea molestias quasi", "Server")));
}

#[tokio::test]
async fn sync_keeps_quote_added_by_another_process() {
    let temp = tempfile::tempdir().unwrap();
    let (watcher, local) = sqlite_app(temp.path()).await;
    let (other, _) = sqlite_app(temp.path()).await;
    other.book.add("Added elsewhere", "Mine").await.unwrap();

    let watcher = watcher.with_remote(Arc::new(StaticRemoteSource::new(remote(&[(
        "new server post",
        "Server",
    )]))));
    assert!(watcher.sync_service(None).sync_once().await.changed());

    let stored: RecordSet =
        serde_json::from_str(&local.get("quotes").await.unwrap().unwrap()).unwrap();
    assert!(stored.contains(&Record::new("Added elsewhere", "Mine")));
    assert!(stored.contains(&Record::new("new server post", "Server")));
    assert_eq!(stored.len(), default_records().len() + 2);
}
