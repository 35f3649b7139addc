//! Integration tests for session lifecycle, import, listing and deletion

use blobpilot::generator::ContentMode;
use blobpilot::query::ROOT_FOLDER;
use blobpilot::session::{RecordOrigin, SessionStore};
use blobpilot::{PilotError, ProgressEvent};

mod common;

#[tokio::test]
async fn test_connect_with_every_key_spelling_gives_same_address() {
    let engine = common::create_engine().await;
    let plain = engine.pilot.connect(common::TEST_KEY).await.unwrap();
    let prefixed = engine
        .pilot
        .connect(&format!("ed25519-priv-0x{}", common::TEST_KEY))
        .await
        .unwrap();

    assert_eq!(plain.address, prefixed.address);
    assert_ne!(plain.session_id, prefixed.session_id);
}

#[tokio::test]
async fn test_invalid_key_creates_nothing() {
    let engine = common::create_engine().await;
    let err = engine.pilot.connect("not-a-key").await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<PilotError>(),
        Some(PilotError::InvalidCredentials(_))
    ));
    assert!(engine.pilot.context().store.is_empty().await);
}

#[tokio::test]
async fn test_import_twice_grows_history_once() {
    let engine = common::create_engine().await;
    let session = engine.pilot.connect(common::TEST_KEY).await.unwrap();
    let names = vec!["docs/report.txt".to_string()];

    engine
        .pilot
        .import_existing(&session.session_id, &names)
        .await
        .unwrap();
    let second = engine
        .pilot
        .import_existing(&session.session_id, &names)
        .await
        .unwrap();

    assert_eq!(second.added, 0);
    assert_eq!(second.total, 1);

    let listing = engine.pilot.list_uploads(&session.session_id).await.unwrap();
    assert_eq!(listing.uploads[0].origin, RecordOrigin::Imported);
}

#[tokio::test]
async fn test_listing_groups_by_folder() {
    let engine = common::create_engine().await;
    let session = engine.pilot.connect(common::TEST_KEY).await.unwrap();
    engine
        .pilot
        .import_existing(
            &session.session_id,
            &[
                "docs/report.txt".to_string(),
                "readme.txt".to_string(),
                "docs/2024/notes.md".to_string(),
            ],
        )
        .await
        .unwrap();

    let listing = engine.pilot.list_uploads(&session.session_id).await.unwrap();
    assert_eq!(listing.count, 3);
    assert_eq!(listing.folders["docs"][0].name, "docs/report.txt");
    assert_eq!(listing.folders[ROOT_FOLDER][0].name, "readme.txt");
    assert_eq!(listing.folders["docs/2024"][0].name, "docs/2024/notes.md");

    let json = serde_json::to_value(&listing).unwrap();
    assert_eq!(json["count"], 3);
    assert_eq!(json["address"], session.address.as_str());
}

#[tokio::test]
async fn test_delete_uploaded_items_removes_them() {
    let engine = common::create_engine().await;
    let session = engine.pilot.connect(common::TEST_KEY).await.unwrap();
    let mut events = engine.pilot.subscribe(&session.session_id).await.unwrap();

    engine
        .pilot
        .start_batch(&session.session_id, ContentMode::Text, Some(2), Some(0))
        .await
        .unwrap();
    let uploaded: Vec<String> = common::collect_until_done(&mut events)
        .await
        .into_iter()
        .filter_map(|e| match e {
            ProgressEvent::Uploaded { name, .. } => Some(name),
            _ => None,
        })
        .collect();
    assert_eq!(uploaded.len(), 2);

    engine.ledger.fail_deletion(uploaded[1].clone(), "EOBJECT_NOT_FOUND");
    let report = engine
        .pilot
        .delete_blobs(&session.session_id, &uploaded)
        .await
        .unwrap();

    assert!(report.results[0].success);
    assert!(!report.results[1].success);
    assert_eq!(report.summary.deleted, 1);
    assert_eq!(report.summary.failed, 1);

    let history = engine.pilot.get_session(&session.session_id).await.unwrap();
    assert!(!history.has_upload(&uploaded[0]));
    assert!(history.has_upload(&uploaded[1]));

    let account = &session.address;
    assert!(engine.storage.object(account, &uploaded[0]).is_none());
}

#[tokio::test]
async fn test_disconnect_persists_removal() {
    let engine = common::create_engine().await;
    let kept = engine.pilot.connect(common::TEST_KEY).await.unwrap();
    let gone = engine.pilot.connect(common::OTHER_KEY).await.unwrap();

    engine.pilot.disconnect(&gone.session_id).await.unwrap();

    let reopened = SessionStore::open(engine.store_path()).await.unwrap();
    assert!(reopened.contains(&kept.session_id).await);
    assert!(blobpilot::error::is_not_found(
        &reopened.get(&gone.session_id).await.unwrap_err()
    ));
}

#[tokio::test]
async fn test_operations_on_unknown_session_are_not_found() {
    let engine = common::create_engine().await;

    let errors = vec![
        engine.pilot.list_uploads("nope").await.unwrap_err(),
        engine
            .pilot
            .import_existing("nope", &["a".to_string()])
            .await
            .unwrap_err(),
        engine
            .pilot
            .delete_blobs("nope", &["a".to_string()])
            .await
            .unwrap_err(),
        engine
            .pilot
            .start_batch("nope", ContentMode::Text, Some(1), Some(0))
            .await
            .unwrap_err(),
    ];
    for err in errors {
        assert!(blobpilot::error::is_not_found(&err), "got {}", err);
    }
}
