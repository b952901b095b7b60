use journal::JournalError;
use journal::media::Upload;

use crate::support::{clip, in_memory, photo, seed, upload_one};

mod dedup {
    use super::*;

    #[tokio::test]
    async fn identical_uploads_become_distinct_records() {
        let journal = in_memory().await;
        let seeded = seed(&journal, "a").await;

        let results = journal
            .attach_uploads(
                &seeded.exercise,
                vec![clip("1.mp4", b"same"), clip("2.mp4", b"same"), clip("3.mp4", b"same")],
            )
            .await
            .unwrap();

        let ids: Vec<String> = results
            .into_iter()
            .map(|r| r.unwrap().media_id().unwrap().to_string())
            .collect();
        assert_eq!(ids.len(), 3);
        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[1], ids[2]);
        assert_eq!(journal.stats().await.unwrap().count, 3);
    }

    #[tokio::test]
    async fn shared_record_survives_owner_changes() {
        let journal = in_memory().await;
        let seeded = seed(&journal, "a").await;
        let media_id = upload_one(&journal, &seeded.exercise, photo("a.png", 10)).await;
        journal
            .attach_existing(&seeded.meal, &media_id)
            .await
            .unwrap();
        assert_eq!(journal.media_usage(&media_id).await.unwrap(), 2);

        let local_id = journal.media_of(&seeded.exercise).await.unwrap()[0]
            .local_id
            .clone();
        journal.detach(&seeded.exercise, &local_id).await.unwrap();
        assert!(journal.blobs().contains(&media_id).await.unwrap());

        journal.delete_meal(&seeded.meal_id).await.unwrap();
        assert!(journal.blobs().contains(&media_id).await.unwrap());
        assert_eq!(journal.media_usage(&media_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn cascade_delete_keeps_media() {
        let journal = in_memory().await;
        let seeded = seed(&journal, "a").await;
        let media_id = upload_one(&journal, &seeded.exercise, clip("x.mp4", b"clip")).await;

        assert_eq!(journal.delete_day(&seeded.day_id).await.unwrap(), 1);
        let dataset = journal.dataset().await.unwrap();
        assert!(dataset.exercises.is_empty());
        assert!(journal.blobs().contains(&media_id).await.unwrap());
    }
}

mod uploads {
    use super::*;

    #[tokio::test]
    async fn photos_are_stored_as_jpeg_and_keep_order() {
        let journal = in_memory().await;
        let seeded = seed(&journal, "a").await;

        journal
            .attach_uploads(
                &seeded.meal,
                vec![photo("1.png", 1), clip("2.mp4", b"v"), photo("3.png", 3)],
            )
            .await
            .unwrap();

        let media = journal.media_of(&seeded.meal).await.unwrap();
        let types: Vec<&str> = media.iter().map(|m| m.mime_type.as_str()).collect();
        assert_eq!(types, vec!["image/jpeg", "video/mp4", "image/jpeg"]);
        assert!(media.iter().all(|m| m.notes.is_empty()));
    }

    #[tokio::test]
    async fn bad_file_does_not_stop_the_batch() {
        let journal = in_memory().await;
        let seeded = seed(&journal, "a").await;

        let results = journal
            .attach_uploads(
                &seeded.exercise,
                vec![
                    Upload::new("broken.png", "image/png", b"garbage".to_vec()),
                    photo("ok.png", 50),
                ],
            )
            .await
            .unwrap();

        assert!(matches!(results[0], Err(JournalError::Decode(_))));
        assert!(results[1].is_ok());
        assert_eq!(journal.media_of(&seeded.exercise).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_owner_is_not_found() {
        let journal = in_memory().await;
        let owner = journal::MediaOwner::Exercise("missing".into());
        let result = journal.attach_uploads(&owner, vec![photo("a.png", 1)]).await;
        assert!(matches!(result, Err(JournalError::NotFound(_))));
        assert_eq!(journal.stats().await.unwrap().count, 0);
    }
}

mod references {
    use super::*;

    #[tokio::test]
    async fn notes_edit_in_place() {
        let journal = in_memory().await;
        let seeded = seed(&journal, "a").await;
        upload_one(&journal, &seeded.exercise, clip("1.mp4", b"1")).await;
        upload_one(&journal, &seeded.exercise, clip("2.mp4", b"2")).await;

        let before = journal.media_of(&seeded.exercise).await.unwrap();
        journal
            .set_media_notes(&seeded.exercise, &before[1].local_id, "depth ok")
            .await
            .unwrap();

        let after = journal.media_of(&seeded.exercise).await.unwrap();
        assert_eq!(after[0], before[0]);
        assert_eq!(after[1].notes, "depth ok");
        assert_eq!(after[1].local_id, before[1].local_id);
        assert_eq!(after[1].source, before[1].source);

        let missing = journal
            .set_media_notes(&seeded.exercise, "nope", "x")
            .await;
        assert!(matches!(missing, Err(JournalError::NotFound(_))));
    }

    #[tokio::test]
    async fn gallery_notes_are_persisted() {
        let journal = in_memory().await;
        let seeded = seed(&journal, "a").await;
        upload_one(&journal, &seeded.meal, clip("1.mp4", b"1")).await;
        upload_one(&journal, &seeded.meal, clip("2.mp4", b"2")).await;

        let media = journal.media_of(&seeded.meal).await.unwrap();
        let mut gallery = journal
            .open_gallery(&seeded.meal, &media[1].local_id)
            .await
            .unwrap()
            .unwrap();
        gallery.next();
        assert_eq!(gallery.current().local_id, media[0].local_id);

        assert!(
            journal
                .set_gallery_notes(&seeded.meal, &mut gallery, "first")
                .await
                .unwrap()
        );
        assert_eq!(journal.media_of(&seeded.meal).await.unwrap()[0].notes, "first");
    }

    #[tokio::test]
    async fn display_handles_are_shared_and_released() {
        let journal = in_memory().await;
        let seeded = seed(&journal, "a").await;
        let media_id = upload_one(&journal, &seeded.exercise, clip("1.mp4", b"bytes")).await;
        let media_ref = journal.media_of(&seeded.exercise).await.unwrap().remove(0);

        let first = journal.resolve(&media_ref).await.unwrap().unwrap();
        let second = journal.resolve_id(&media_id).await.unwrap().unwrap();
        assert_eq!(first.url, second.url);
        assert_eq!(&*first.bytes, b"bytes");
        assert_eq!(journal.handles().len(), 1);

        assert!(journal.resolve_id("missing").await.unwrap().is_none());
        assert_eq!(journal.release_all(), 1);
        assert!(journal.handles().is_empty());
    }

    #[tokio::test]
    async fn empty_titles_are_rejected() {
        let journal = in_memory().await;
        assert!(matches!(
            journal.add_day("   ").await,
            Err(JournalError::Validation(_))
        ));
        let day = journal.add_day(" Push ").await.unwrap();
        assert_eq!(day.title, "Push");
        assert!(matches!(
            journal.add_exercise(&day.id, "", "").await,
            Err(JournalError::Validation(_))
        ));
        assert!(matches!(
            journal.add_progress("yesterday", Some(80.0), "").await,
            Err(JournalError::Validation(_))
        ));
    }
}
