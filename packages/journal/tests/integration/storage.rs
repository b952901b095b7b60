use std::sync::Arc;

use common::storage::StateStore;
use common::storage::filesystem::FilesystemStateStore;
use common::storage::memory::{MemoryBlobStore, MemoryStateStore};
use journal::media::Upload;
use journal::migration::{CURRENT_MEDIA_VERSION, SchemaMeta};
use journal::{ExerciseUpdate, Journal, JournalError, PhotoSlot, Scope, View};
use serde_json::json;

use crate::support::{TestJournal, assert_consistent, clip, photo, seed, upload_one};

#[tokio::test]
async fn data_survives_reopen() {
    let test = TestJournal::on_disk().await;
    let seeded = seed(&test.journal, "disk").await;
    let media_id = upload_one(&test.journal, &seeded.exercise, photo("p.png", 9)).await;
    test.journal
        .update_exercise(
            &seeded.exercise_id,
            ExerciseUpdate {
                done: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let reopened = test.reopen().await;
    let report = reopened.startup().await.unwrap();
    assert!(report.skipped);

    let dataset = reopened.dataset().await.unwrap();
    assert!(dataset.exercise(&seeded.exercise_id).unwrap().done);
    let record = reopened.blobs().get(&media_id).await.unwrap().unwrap();
    assert_eq!(record.mime_type, "image/jpeg");
    assert_eq!(&record.bytes[..2], &[0xFF, 0xD8]);
    assert_consistent(&reopened).await;
}

#[tokio::test]
async fn legacy_inline_media_is_migrated_once() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::config::StorageConfig {
        data_dir: dir.path().to_path_buf(),
        quota_bytes: None,
    };

    // State as an older release left it: inline bytes and no schema entry.
    let state = FilesystemStateStore::new(config.state_dir()).await.unwrap();
    let meals = json!([{
        "id": "m1",
        "title": "Oats",
        "media": [{"id": "l1", "type": "image/jpeg", "src": "data:image/jpeg;base64,AAEC", "notes": "n"}]
    }]);
    state.write("ft_meals", &meals.to_string()).await.unwrap();
    state
        .write("progress", r#"[{"date": "2026-01-01", "weight": 90}]"#)
        .await
        .unwrap();

    let journal = Journal::open(&config).await.unwrap();
    let report = journal.startup().await.unwrap();
    assert!(!report.skipped);
    assert_eq!(report.converted, 1);
    assert_eq!(report.records_updated, 1);

    let dataset = journal.dataset().await.unwrap();
    let media_id = dataset.meals[0].media[0].media_id().unwrap().to_string();
    assert_eq!(dataset.meals[0].media[0].local_id, "l1");
    assert!(journal.blobs().contains(&media_id).await.unwrap());
    assert!(!dataset.progress[0].id.is_empty());

    let schema = SchemaMeta::load(&state).await.unwrap();
    assert_eq!(schema.media_version, CURRENT_MEDIA_VERSION);

    let again = Journal::open(&config).await.unwrap().startup().await.unwrap();
    assert!(again.skipped);
    assert_eq!(journal.stats().await.unwrap().count, 1);
}

#[tokio::test]
async fn quota_failure_is_reported_per_file() {
    let test = TestJournal::with_quota(Some(16)).await;
    let seeded = seed(&test.journal, "q").await;

    let results = test
        .journal
        .attach_uploads(
            &seeded.meal,
            vec![clip("small.mp4", &[1; 8]), clip("big.mp4", &[2; 32])],
        )
        .await
        .unwrap();
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(JournalError::StorageUnavailable(_))));
    assert_eq!(test.journal.media_of(&seeded.meal).await.unwrap().len(), 1);
}

#[tokio::test]
async fn offline_store_fails_operations_without_losing_data() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let journal = Journal::new(blobs.clone(), Arc::new(MemoryStateStore::new()));
    journal.startup().await.unwrap();
    let seeded = seed(&journal, "x").await;
    upload_one(&journal, &seeded.exercise, clip("a.mp4", b"a")).await;

    blobs.set_available(false);
    assert!(matches!(
        journal.stats().await,
        Err(JournalError::StorageUnavailable(_))
    ));
    assert!(matches!(
        journal.export(Scope::All, true).await,
        Err(JournalError::StorageUnavailable(_))
    ));
    let upload = journal
        .attach_uploads(&seeded.exercise, vec![Upload::new("b.mp4", "video/mp4", vec![1])])
        .await
        .unwrap();
    assert!(matches!(upload[0], Err(JournalError::StorageUnavailable(_))));

    blobs.set_available(true);
    assert_eq!(journal.stats().await.unwrap().count, 1);
    assert_eq!(journal.media_of(&seeded.exercise).await.unwrap().len(), 1);
}

#[tokio::test]
async fn replacing_a_progress_photo_drops_the_old_record() {
    let test = TestJournal::on_disk().await;
    let journal = &test.journal;
    let entry = journal.add_progress("2026-04-02", None, "").await.unwrap();

    let first = journal
        .set_progress_photo(&entry.id, PhotoSlot::Back, photo("b1.png", 1))
        .await
        .unwrap();
    let second = journal
        .set_progress_photo(&entry.id, PhotoSlot::Back, photo("b2.png", 2))
        .await
        .unwrap();

    assert!(!journal.blobs().contains(&first.media_id).await.unwrap());
    assert!(journal.blobs().contains(&second.media_id).await.unwrap());
    let dataset = journal.dataset().await.unwrap();
    assert_eq!(
        dataset.progress_entry(&entry.id).unwrap().photos.get(PhotoSlot::Back),
        Some(second.media_id.as_str())
    );
}

#[tokio::test]
async fn views_fall_back_when_their_record_disappears() {
    let test = TestJournal::on_disk().await;
    let seeded = seed(&test.journal, "v").await;
    let view = View::exercise(&seeded.day_id, &seeded.exercise_id);

    assert!(view.is_valid(&test.journal.dataset().await.unwrap()));
    test.journal.delete_exercise(&seeded.exercise_id).await.unwrap();

    let dataset = test.journal.dataset().await.unwrap();
    assert_eq!(view.revalidate(&dataset), View::day(&seeded.day_id));
}
