use journal::model::PhotoSlot;
use journal::{ImportMode, Scope};
use serde_json::json;

use crate::support::{assert_consistent, clip, in_memory, photo, seed, upload_one};

#[tokio::test]
async fn dry_run_projects_without_deleting() {
    let journal = in_memory().await;
    let seeded = seed(&journal, "a").await;
    let kept = upload_one(&journal, &seeded.exercise, clip("keep.mp4", b"keep")).await;
    let dropped = upload_one(&journal, &seeded.exercise, clip("drop.mp4", b"drop!")).await;
    let local_id = journal.media_of(&seeded.exercise).await.unwrap()[1]
        .local_id
        .clone();
    journal.detach(&seeded.exercise, &local_id).await.unwrap();

    let report = journal.reclaim_unused(true).await.unwrap();
    assert!(report.dry_run);
    assert_eq!(report.unused_count, 1);
    assert_eq!(report.unused_ids, vec![dropped.clone()]);
    assert_eq!(report.before.count, 2);
    assert_eq!(report.after.count, 1);
    assert_eq!(report.freed_bytes(), 5);
    assert!(journal.blobs().contains(&dropped).await.unwrap());
    assert!(journal.blobs().contains(&kept).await.unwrap());
}

#[tokio::test]
async fn execute_keeps_everything_referenced() {
    let journal = in_memory().await;
    let seeded = seed(&journal, "a").await;
    let shared = upload_one(&journal, &seeded.exercise, clip("s.mp4", b"shared")).await;
    journal.attach_existing(&seeded.meal, &shared).await.unwrap();

    let entry = journal.add_progress("2026-03-01", Some(81.5), "").await.unwrap();
    let front = journal
        .set_progress_photo(&entry.id, PhotoSlot::Front, photo("front.png", 40))
        .await
        .unwrap();

    // Same bytes under another id, referenced by nobody.
    let twin = upload_one(&journal, &seeded.exercise, clip("t.mp4", b"shared")).await;
    let local_id = journal.media_of(&seeded.exercise).await.unwrap()[1]
        .local_id
        .clone();
    journal.detach(&seeded.exercise, &local_id).await.unwrap();

    let report = journal.reclaim_unused(false).await.unwrap();
    assert!(!report.dry_run);
    assert_eq!(report.unused_ids, vec![twin.clone()]);
    assert_eq!(report.after.count, 2);

    let blobs = journal.blobs();
    assert!(blobs.contains(&shared).await.unwrap());
    assert!(blobs.contains(&front.media_id).await.unwrap());
    assert!(!blobs.contains(&twin).await.unwrap());
    assert_consistent(&journal).await;
}

#[tokio::test]
async fn second_pass_finds_nothing() {
    let journal = in_memory().await;
    let seeded = seed(&journal, "a").await;
    upload_one(&journal, &seeded.meal, clip("x.mp4", b"x")).await;
    journal.delete_meal(&seeded.meal_id).await.unwrap();

    assert_eq!(journal.reclaim_unused(false).await.unwrap().unused_count, 1);
    let again = journal.reclaim_unused(false).await.unwrap();
    assert_eq!(again.unused_count, 0);
    assert_eq!(again.before, again.after);
}

#[tokio::test]
async fn reclaim_revokes_display_handles() {
    let journal = in_memory().await;
    let seeded = seed(&journal, "a").await;
    let media_id = upload_one(&journal, &seeded.exercise, clip("x.mp4", b"x")).await;
    journal.resolve_id(&media_id).await.unwrap().unwrap();
    journal.delete_exercise(&seeded.exercise_id).await.unwrap();

    journal.reclaim_unused(false).await.unwrap();
    assert!(journal.handles().is_empty());
}

#[tokio::test]
async fn replace_import_with_empty_store_revokes_display_handles() {
    let journal = in_memory().await;
    let seeded = seed(&journal, "a").await;
    let media_id = upload_one(&journal, &seeded.exercise, clip("x.mp4", b"clip")).await;
    journal.resolve_id(&media_id).await.unwrap().unwrap();

    let document = json!({
        "data": {
            "train": {"days": [], "exercises": []},
            "media": {"store": {"version": 1, "items": {}}}
        }
    });
    let report = journal
        .import_str(&document.to_string(), ImportMode::Replace, Scope::Train)
        .await
        .unwrap();
    assert!(report.store_cleared);
    assert_eq!(report.media_imported, 0);

    assert!(!journal.blobs().contains(&media_id).await.unwrap());
    assert!(journal.handles().is_empty());
    assert!(journal.resolve_id(&media_id).await.unwrap().is_none());
}

#[tokio::test]
async fn media_list_reports_reference_counts() {
    let journal = in_memory().await;
    let seeded = seed(&journal, "a").await;
    let media_id = upload_one(&journal, &seeded.exercise, clip("x.mp4", b"abc")).await;
    journal.attach_existing(&seeded.meal, &media_id).await.unwrap();

    let list = journal.media_list().await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].meta.id, media_id);
    assert_eq!(list[0].meta.size, 3);
    assert_eq!(list[0].references, 2);

    let stats = journal.stats().await.unwrap();
    assert_eq!((stats.count, stats.bytes), (1, 3));
}
