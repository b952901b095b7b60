use journal::{ImportMode, Journal, JournalError, PhotoSlot, Scope};
use serde_json::json;

use crate::support::{assert_consistent, clip, in_memory, photo, seed, upload_one};

/// A journal with media on an exercise, a meal and a progress photo.
async fn populated(label: &str) -> Journal {
    let journal = in_memory().await;
    let seeded = seed(&journal, label).await;
    let shared = upload_one(&journal, &seeded.exercise, clip("a.mp4", label.as_bytes())).await;
    journal.attach_existing(&seeded.meal, &shared).await.unwrap();
    upload_one(&journal, &seeded.meal, photo("plate.png", 70)).await;

    let entry = journal
        .add_progress("2026-02-01", Some(80.0), label)
        .await
        .unwrap();
    journal
        .set_progress_photo(&entry.id, PhotoSlot::Side, photo("side.png", 20))
        .await
        .unwrap();
    journal
}

#[tokio::test]
async fn round_trip_reproduces_the_dataset() {
    let source = populated("src").await;
    let json = source.export_json(Scope::All, true).await.unwrap();

    let target = in_memory().await;
    let report = target
        .import_str(&json, ImportMode::Replace, Scope::All)
        .await
        .unwrap();
    assert_eq!(report.media_imported, 3);
    assert_eq!(report.records_reidentified, 0);

    assert_eq!(target.dataset().await.unwrap(), source.dataset().await.unwrap());
    let mut source_ids = source.blobs().list_ids().await.unwrap();
    let mut target_ids = target.blobs().list_ids().await.unwrap();
    source_ids.sort();
    target_ids.sort();
    assert_eq!(source_ids, target_ids);
    for id in &source_ids {
        let a = source.blobs().get(id).await.unwrap().unwrap();
        let b = target.blobs().get(id).await.unwrap().unwrap();
        assert_eq!(a, b);
    }
    assert_consistent(&target).await;
}

#[tokio::test]
async fn merging_independent_journals_keeps_references_intact() {
    let local = populated("local").await;
    let remote = populated("remote").await;
    let before = local.dataset().await.unwrap();

    let json = remote.export_json(Scope::All, true).await.unwrap();
    let report = local
        .import_str(&json, ImportMode::Add, Scope::All)
        .await
        .unwrap();
    assert_eq!(report.records_imported, 5);
    assert_eq!(report.media_imported, 3);

    let after = local.dataset().await.unwrap();
    assert_eq!(after.days.len(), 2);
    assert_eq!(after.exercises.len(), 2);
    assert_eq!(after.meals.len(), 2);
    assert_eq!(after.progress.len(), 2);
    for day in &before.days {
        assert_eq!(after.day(&day.id), Some(day));
    }
    assert_eq!(local.stats().await.unwrap().count, 6);
    assert_consistent(&local).await;
}

#[tokio::test]
async fn importing_twice_remaps_every_collision() {
    let local = populated("local").await;
    let remote = populated("remote").await;
    let json = remote.export_json(Scope::All, true).await.unwrap();

    let first = local
        .import_str(&json, ImportMode::Add, Scope::All)
        .await
        .unwrap();
    assert_eq!(first.media_reidentified, 0);
    let after_first = local.dataset().await.unwrap();

    let second = local
        .import_str(&json, ImportMode::Add, Scope::All)
        .await
        .unwrap();
    assert_eq!(second.media_reidentified, 3);
    assert_eq!(second.records_reidentified, 5);

    let after_second = local.dataset().await.unwrap();
    assert_eq!(after_second.days.len(), 3);
    assert_eq!(after_second.progress.len(), 3);
    for exercise in &after_first.exercises {
        assert_eq!(after_second.exercise(&exercise.id), Some(exercise));
    }
    for entry in &after_first.progress {
        assert_eq!(after_second.progress_entry(&entry.id), Some(entry));
    }
    assert_eq!(local.stats().await.unwrap().count, 9);
    assert_consistent(&local).await;
}

#[tokio::test]
async fn scope_limits_what_is_taken() {
    let source = populated("src").await;
    let json = source.export_json(Scope::All, false).await.unwrap();

    let target = in_memory().await;
    seed(&target, "mine").await;
    target
        .import_str(&json, ImportMode::Replace, Scope::Food)
        .await
        .unwrap();

    let dataset = target.dataset().await.unwrap();
    assert_eq!(dataset.days[0].title, "mine day");
    assert_eq!(dataset.meal_types[0].title, "src lunch");
    assert!(dataset.progress.is_empty());
}

#[tokio::test]
async fn missing_section_is_a_scope_mismatch() {
    let source = populated("src").await;
    let json = source.export_json(Scope::Train, false).await.unwrap();

    let target = in_memory().await;
    let result = target.import_str(&json, ImportMode::Add, Scope::Food).await;
    assert!(matches!(result, Err(JournalError::ScopeMismatch(Scope::Food))));
}

#[tokio::test]
async fn bad_documents_change_nothing() {
    let journal = populated("local").await;
    let before = journal.dataset().await.unwrap();
    let stats = journal.stats().await.unwrap();

    let not_json = journal.import_str("{ nope", ImportMode::Replace, Scope::All).await;
    assert!(matches!(not_json, Err(JournalError::InvalidDocument(_))));

    let broken_media = json!({
        "data": {
            "train": {"days": [], "exercises": []},
            "media": {"store": {"items": {"x": {"type": "image/jpeg", "src": "not a data url"}}}}
        }
    });
    let result = journal
        .import_str(&broken_media.to_string(), ImportMode::Replace, Scope::All)
        .await;
    assert!(matches!(result, Err(JournalError::InvalidDocument(_))));

    assert_eq!(journal.dataset().await.unwrap(), before);
    assert_eq!(journal.stats().await.unwrap(), stats);
}

#[tokio::test]
async fn malformed_store_item_rejects_the_import() {
    let journal = populated("local").await;
    let before = journal.dataset().await.unwrap();
    let stats = journal.stats().await.unwrap();

    let document = json!({
        "data": {
            "train": {
                "days": [{"id": "d1", "title": "Legs"}],
                "exercises": [{
                    "id": "e1",
                    "dayId": "d1",
                    "name": "Squat",
                    "media": [{"id": "l1", "type": "image/jpeg", "ref": "m1"}]
                }]
            },
            "media": {"store": {"version": 1, "items": {"m1": {"id": "m1", "src": 5}}}}
        }
    });
    let result = journal
        .import_str(&document.to_string(), ImportMode::Add, Scope::All)
        .await;
    assert!(matches!(result, Err(JournalError::InvalidDocument(_))));

    assert_eq!(journal.dataset().await.unwrap(), before);
    assert_eq!(journal.stats().await.unwrap(), stats);
    assert_consistent(&journal).await;
}

#[tokio::test]
async fn legacy_documents_are_converted_on_import() {
    let document = json!({
        "data": {
            "food": {
                "mealtypes": [{"id": "t1", "title": "Breakfast"}],
                "meals": [{
                    "id": "m1",
                    "mealTypeId": "t1",
                    "title": "Oats",
                    "media": [
                        {"id": "l1", "type": "image/jpeg", "src": "data:image/jpeg;base64,AAEC", "notes": "old"},
                        {"id": "l2", "type": "image/jpeg", "ref": "k1"}
                    ]
                }]
            },
            "media": {"store": {"k1": {"type": "image/jpeg", "src": "data:image/jpeg;base64,BwgJ"}}}
        }
    });

    let journal = in_memory().await;
    let report = journal
        .import_str(&document.to_string(), ImportMode::Add, Scope::Food)
        .await
        .unwrap();
    assert_eq!(report.inline_converted, 1);
    assert_eq!(report.media_imported, 1);

    let dataset = journal.dataset().await.unwrap();
    let media = &dataset.meal("m1").unwrap().media;
    assert!(media.iter().all(|m| !m.is_inline()));
    assert_eq!(media[0].notes, "old");
    assert_eq!(media[1].media_id(), Some("k1"));

    let converted = media[0].media_id().unwrap();
    let record = journal.blobs().get(converted).await.unwrap().unwrap();
    assert_eq!(record.bytes, vec![0, 1, 2]);
    assert_consistent(&journal).await;
}

#[tokio::test]
async fn exported_document_shape() {
    let journal = populated("src").await;
    let document = journal.export(Scope::Progress, true).await.unwrap();
    let value = serde_json::to_value(&document).unwrap();

    assert_eq!(value["app"], "App-Fitness");
    assert_eq!(value["scope"], "progress");
    assert_eq!(value["includesMedia"], true);
    assert!(value["data"].get("train").is_none());
    assert_eq!(value["data"]["media"]["store"]["version"], 1);
    let items = value["data"]["media"]["store"]["items"].as_object().unwrap();
    assert_eq!(items.len(), 3);
    let src = items.values().next().unwrap()["src"].as_str().unwrap();
    assert!(src.starts_with("data:"));

    let name = journal.export_file_name(Scope::Progress, true);
    assert!(name.starts_with("App-Fitness_progress_WITH_MEDIA_"));
    assert!(name.ends_with(".json"));
}
