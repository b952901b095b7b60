use journal::{ImportMode, MediaOwner, PhotoSlot, Scope};
use serde_json::json;

use crate::support::{assert_consistent, clip, in_memory, seed, upload_one};

#[tokio::test]
async fn deleted_owner_frees_only_its_media() {
    let journal = in_memory().await;
    let seeded = seed(&journal, "a").await;
    let e2 = journal
        .add_exercise(&seeded.day_id, "deadlift", "")
        .await
        .unwrap();
    let e2_owner = MediaOwner::Exercise(e2.id.clone());

    let a = upload_one(&journal, &seeded.exercise, clip("a.mp4", b"aaaa")).await;
    journal.attach_existing(&seeded.meal, &a).await.unwrap();
    let b = upload_one(&journal, &e2_owner, clip("b.mp4", b"bb")).await;

    journal.delete_exercise(&e2.id).await.unwrap();

    let live = journal.live_media_ids().await.unwrap();
    assert_eq!(live.len(), 1);
    assert!(live.contains(&a));

    let report = journal.reclaim_unused(false).await.unwrap();
    assert_eq!(report.unused_count, 1);
    assert_eq!(report.unused_ids, vec![b.clone()]);
    assert!(journal.blobs().contains(&a).await.unwrap());
    assert!(!journal.blobs().contains(&b).await.unwrap());
}

#[tokio::test]
async fn colliding_day_gets_fresh_id_and_children_follow() {
    let journal = in_memory().await;
    let local = json!({
        "app": "App-Fitness",
        "scope": "train",
        "data": {
            "train": {
                "days": [{"id": "d1", "title": "Other"}],
                "exercises": []
            }
        }
    });
    journal
        .import_str(&local.to_string(), ImportMode::Replace, Scope::Train)
        .await
        .unwrap();

    let incoming = json!({
        "app": "App-Fitness",
        "scope": "train",
        "data": {
            "train": {
                "days": [{"id": "d1", "title": "Legs"}],
                "exercises": [{"id": "e1", "dayId": "d1", "name": "Squat"}]
            }
        }
    });
    let report = journal
        .import_str(&incoming.to_string(), ImportMode::Add, Scope::Train)
        .await
        .unwrap();
    assert_eq!(report.records_reidentified, 1);

    let dataset = journal.dataset().await.unwrap();
    assert_eq!(dataset.days.len(), 2);
    assert_eq!(dataset.day("d1").unwrap().title, "Other");

    let legs = dataset.days.iter().find(|d| d.title == "Legs").unwrap();
    assert_ne!(legs.id, "d1");
    let squat = dataset.exercise("e1").unwrap();
    assert_eq!(squat.day_id.as_deref(), Some(legs.id.as_str()));
    assert_eq!(dataset.exercises_of("d1").count(), 0);
    assert_consistent(&journal).await;
}

#[tokio::test]
async fn removing_a_progress_photo_deletes_it_eagerly() {
    let journal = in_memory().await;
    let document = json!({
        "app": "App-Fitness",
        "scope": "progress",
        "includesMedia": true,
        "data": {
            "progress": {
                "records": [{
                    "id": "p1",
                    "date": "2026-01-10",
                    "weight": 82.4,
                    "photos": {"front": "m1", "side": null, "back": "m3"}
                }]
            },
            "media": {
                "store": {
                    "version": 1,
                    "items": {
                        "m1": {"id": "m1", "type": "image/jpeg", "src": "data:image/jpeg;base64,AAEC"},
                        "m3": {"id": "m3", "type": "image/jpeg", "src": "data:image/jpeg;base64,AwQF"}
                    }
                }
            }
        }
    });
    journal
        .import_str(&document.to_string(), ImportMode::Replace, Scope::Progress)
        .await
        .unwrap();

    let removed = journal
        .remove_progress_photo("p1", PhotoSlot::Front)
        .await
        .unwrap();
    assert_eq!(removed.as_deref(), Some("m1"));

    assert!(!journal.blobs().contains("m1").await.unwrap());
    assert!(journal.blobs().contains("m3").await.unwrap());

    let dataset = journal.dataset().await.unwrap();
    let photos = &dataset.progress_entry("p1").unwrap().photos;
    assert_eq!(photos.front, None);
    assert_eq!(photos.side, None);
    assert_eq!(photos.back.as_deref(), Some("m3"));

    // Empty slot: nothing to remove.
    let again = journal
        .remove_progress_photo("p1", PhotoSlot::Front)
        .await
        .unwrap();
    assert!(again.is_none());
}
