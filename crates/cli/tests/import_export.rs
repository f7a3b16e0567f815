mod common;

use common::sqlite_app;
use quotebook_core::book::BookError;
use quotebook_core::import::ImportError;
use quotebook_core::models::default_records;
use quotebook_core::{Record, RecordSet};
use std::sync::Arc;
use storage::{KeyValueStore, MemoryStore};

async fn empty_app(dir: &std::path::Path) -> cli::app::App {
    let (app, _) = sqlite_app(dir).await;
    app.book.replace(RecordSet::new()).await.unwrap();
    app
}

#[tokio::test]
async fn duplicate_pairs_collapse_on_import() {
    let temp = tempfile::tempdir().unwrap();
    let app = empty_app(temp.path()).await;
    let file = temp.path().join("upload.json");
    std::fs::write(
        &file,
        r#"[{"text":"A","category":"X"},{"text":"A","category":"X"},{"text":"B","category":"Y"}]"#,
    )
    .unwrap();

    let summary = app.import_from(&file).await.unwrap();
    assert_eq!(summary.added, 2);
    assert_eq!(
        app.book.snapshot().await,
        RecordSet::from(vec![Record::new("A", "X"), Record::new("B", "Y")])
    );
}

#[tokio::test]
async fn entry_missing_category_is_dropped() {
    let temp = tempfile::tempdir().unwrap();
    let app = empty_app(temp.path()).await;
    let file = temp.path().join("upload.json");
    std::fs::write(&file, r#"[{"text":"A"},{"text":"B","category":"Y"}]"#).unwrap();

    let summary = app.import_from(&file).await.unwrap();
    assert_eq!((summary.accepted, summary.rejected, summary.added), (1, 1, 1));
    assert_eq!(
        app.book.snapshot().await,
        RecordSet::from(vec![Record::new("B", "Y")])
    );
}

#[tokio::test]
async fn malformed_file_is_rejected_without_changes() {
    let temp = tempfile::tempdir().unwrap();
    let (app, local) = sqlite_app(temp.path()).await;
    let before = local.get("quotes").await.unwrap();
    let file = temp.path().join("upload.json");

    std::fs::write(&file, r#"{"text":"A","category":"X"}"#).unwrap();
    let err = app.import_from(&file).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BookError>(),
        Some(BookError::Import(ImportError::NotAnArray))
    ));

    std::fs::write(&file, r#"[{"category":"X"}]"#).unwrap();
    assert!(app.import_from(&file).await.is_err());
    assert_eq!(local.get("quotes").await.unwrap(), before);
}

#[tokio::test]
async fn export_then_import_into_fresh_store() {
    let temp = tempfile::tempdir().unwrap();
    let (app, _) = sqlite_app(temp.path()).await;
    app.book.add("Exported", "Mine").await.unwrap();
    let out = temp.path().join("exports").join("quotes.json");
    let count = app.export_to(&out).await.unwrap();
    assert_eq!(count, default_records().len() + 1);

    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("[\n  {\n    \"text\""));

    let fresh_local = Arc::new(MemoryStore::new());
    fresh_local.set("quotes", "[]").await.unwrap();
    let fresh = cli::app::App::with_stores(
        app.config.clone(),
        fresh_local,
        Arc::new(MemoryStore::new()),
    )
    .await
    .unwrap();
    let summary = fresh.import_from(&out).await.unwrap();
    assert_eq!(summary.added, count);
    assert_eq!(fresh.book.snapshot().await, app.book.snapshot().await);
}
