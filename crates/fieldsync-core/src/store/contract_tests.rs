//! Behaviour both `LocalStore` backends must share.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;

use super::{LocalStore, MemoryStore, SqliteStore};
use crate::models::{InspectionId, Photo, Recording, SyncItemKind, SyncItemStatus};

fn backends() -> Vec<(&'static str, Box<dyn LocalStore>)> {
    let sqlite: Box<dyn LocalStore> = Box::new(SqliteStore::open_in_memory().unwrap());
    let memory: Box<dyn LocalStore> = Box::new(MemoryStore::new());
    vec![("sqlite", sqlite), ("memory", memory)]
}

fn pause() {
    // Distinct millisecond timestamps for ordering assertions
    std::thread::sleep(Duration::from_millis(3));
}

fn is_dirty(store: &dyn LocalStore, id: InspectionId) -> bool {
    store.get_cached_inspection(id).unwrap().unwrap().is_dirty
}

#[test]
fn save_inspection_upserts_without_touching_dirty_flag() {
    for (name, store) in backends() {
        let id = store
            .save_inspection(&json!({ "id": 1, "address": "1 High St" }))
            .unwrap();
        assert!(!is_dirty(store.as_ref(), id), "{name}");

        store.mark_inspection_dirty(id).unwrap();
        store
            .save_inspection(&json!({ "id": 1, "address": "1 High Street" }))
            .unwrap();

        let cached = store.get_cached_inspection(id).unwrap().unwrap();
        assert!(cached.is_dirty, "{name}: refresh must not clear dirty");
        assert_eq!(cached.record["address"], json!("1 High Street"), "{name}");
    }
}

#[test]
fn save_inspection_rejects_records_without_id() {
    for (name, store) in backends() {
        assert!(
            store.save_inspection(&json!({ "address": "x" })).is_err(),
            "{name}"
        );
    }
}

#[test]
fn get_all_inspections_is_newest_fetched_first() {
    for (name, store) in backends() {
        store.save_inspection(&json!({ "id": 10 })).unwrap();
        pause();
        store.save_inspection(&json!({ "id": 3 })).unwrap();
        pause();
        store.save_inspection(&json!({ "id": 7 })).unwrap();
        store.mark_inspection_dirty(InspectionId::new(3)).unwrap();

        let all = store.get_all_inspections().unwrap();
        let ids: Vec<i64> = all.iter().map(|cached| cached.id.get()).collect();
        assert_eq!(ids, vec![7, 3, 10], "{name}");
        assert!(all[1].is_dirty, "{name}");
        assert!(all[0].fetched_at >= all[1].fetched_at, "{name}");
    }
}

#[test]
fn missing_inspection_reads_as_none() {
    for (name, store) in backends() {
        assert!(store.get_inspection(InspectionId::new(404)).unwrap().is_none(), "{name}");
        assert!(
            store
                .get_cached_inspection(InspectionId::new(404))
                .unwrap()
                .is_none(),
            "{name}"
        );
    }
}

#[test]
fn mark_inspection_synced_clears_dirty_and_stamps_time() {
    for (name, store) in backends() {
        let id = store.save_inspection(&json!({ "id": 2 })).unwrap();
        store.save_report_data(id, &json!({ "a": 1 })).unwrap();
        assert!(is_dirty(store.as_ref(), id), "{name}");

        store.mark_inspection_synced(id).unwrap();
        let cached = store.get_cached_inspection(id).unwrap().unwrap();
        assert!(!cached.is_dirty, "{name}");
        assert!(cached.synced_at.is_some(), "{name}");
    }
}

#[test]
fn report_data_defaults_to_empty_document() {
    for (name, store) in backends() {
        assert_eq!(
            store.get_report_data(InspectionId::new(77)).unwrap(),
            json!({}),
            "{name}"
        );
    }
}

#[test]
fn save_report_data_overwrites_and_supersedes_pending_upload() {
    for (name, store) in backends() {
        let id = store.save_inspection(&json!({ "id": 4 })).unwrap();
        for revision in 0..5 {
            store
                .save_report_data(id, &json!({ "revision": revision }))
                .unwrap();
        }

        assert_eq!(
            store.get_report_data(id).unwrap(),
            json!({ "revision": 4 }),
            "{name}"
        );

        let pending = store.get_pending_sync_items(Some(id)).unwrap();
        assert_eq!(pending.len(), 1, "{name}");
        assert_eq!(pending[0].kind, SyncItemKind::ReportData, "{name}");
        assert_eq!(
            pending[0].payload,
            json!({ "inspection_id": 4, "report_data": { "revision": 4 } }),
            "{name}"
        );
        assert!(is_dirty(store.as_ref(), id), "{name}");
    }
}

#[test]
fn supersession_only_replaces_pending_report_data() {
    for (name, store) in backends() {
        let id = InspectionId::new(4);
        store.save_report_data(id, &json!({ "v": 1 })).unwrap();
        let failed = store.get_pending_sync_items(Some(id)).unwrap()[0].id;
        store
            .mark_sync_item_status(failed, SyncItemStatus::Error, Some("HTTP 500"))
            .unwrap();
        store
            .enqueue_sync_item(id, SyncItemKind::Status, &json!({}))
            .unwrap();

        store.save_report_data(id, &json!({ "v": 2 })).unwrap();

        let all = store.list_sync_items(Some(id)).unwrap();
        let summary: Vec<(SyncItemKind, SyncItemStatus)> =
            all.iter().map(|item| (item.kind, item.status)).collect();
        assert_eq!(
            summary,
            vec![
                (SyncItemKind::ReportData, SyncItemStatus::Error),
                (SyncItemKind::Status, SyncItemStatus::Pending),
                (SyncItemKind::ReportData, SyncItemStatus::Pending),
            ],
            "{name}"
        );
        // Other inspections are never superseded
        store.save_report_data(InspectionId::new(5), &json!({})).unwrap();
        assert_eq!(
            store.get_pending_sync_items(Some(id)).unwrap().len(),
            2,
            "{name}"
        );
    }
}

#[test]
fn pending_items_order_globally_by_inspection_then_sequence() {
    for (name, store) in backends() {
        let a = InspectionId::new(20);
        let b = InspectionId::new(10);
        let first = store
            .enqueue_sync_item(a, SyncItemKind::Photo, &json!({ "n": 1 }))
            .unwrap();
        let second = store
            .enqueue_sync_item(b, SyncItemKind::Recording, &json!({ "n": 2 }))
            .unwrap();
        let third = store
            .enqueue_sync_item(a, SyncItemKind::Status, &json!({ "n": 3 }))
            .unwrap();

        let global: Vec<i64> = store
            .get_pending_sync_items(None)
            .unwrap()
            .iter()
            .map(|item| item.id)
            .collect();
        assert_eq!(global, vec![second, first, third], "{name}");

        let scoped: Vec<i64> = store
            .get_pending_sync_items(Some(a))
            .unwrap()
            .iter()
            .map(|item| item.id)
            .collect();
        assert_eq!(scoped, vec![first, third], "{name}");
    }
}

#[test]
fn mark_sync_item_status_counts_every_attempt() {
    for (name, store) in backends() {
        let id = InspectionId::new(1);
        let item = store
            .enqueue_sync_item(id, SyncItemKind::Photo, &json!({}))
            .unwrap();

        store
            .mark_sync_item_status(item, SyncItemStatus::Error, Some("offline"))
            .unwrap();
        store
            .mark_sync_item_status(item, SyncItemStatus::Done, None)
            .unwrap();

        let all = store.list_sync_items(Some(id)).unwrap();
        assert_eq!(all[0].attempts, 2, "{name}");
        assert_eq!(all[0].status, SyncItemStatus::Done, "{name}");
        assert_eq!(all[0].error_message, None, "{name}");
        assert!(store.get_pending_sync_items(Some(id)).unwrap().is_empty(), "{name}");
    }
}

#[test]
fn clear_done_leaves_pending_and_error_items() {
    for (name, store) in backends() {
        let id = InspectionId::new(1);
        let done = store
            .enqueue_sync_item(id, SyncItemKind::Photo, &json!({}))
            .unwrap();
        let failed = store
            .enqueue_sync_item(id, SyncItemKind::Recording, &json!({}))
            .unwrap();
        store
            .enqueue_sync_item(id, SyncItemKind::Status, &json!({}))
            .unwrap();
        store
            .mark_sync_item_status(done, SyncItemStatus::Done, None)
            .unwrap();
        store
            .mark_sync_item_status(failed, SyncItemStatus::Error, Some("boom"))
            .unwrap();

        assert_eq!(store.clear_done_sync_items().unwrap(), 1, "{name}");

        let statuses: Vec<SyncItemStatus> = store
            .list_sync_items(None)
            .unwrap()
            .iter()
            .map(|item| item.status)
            .collect();
        assert_eq!(
            statuses,
            vec![SyncItemStatus::Error, SyncItemStatus::Pending],
            "{name}"
        );
    }
}

#[test]
fn recordings_are_ordered_and_mark_parent_dirty() {
    for (name, store) in backends() {
        let id = store.save_inspection(&json!({ "id": 6 })).unwrap();
        let first = Recording::new(id, "hall.floor", "Floor", "rec/1.webm");
        pause();
        let second = Recording::new(id, "hall.walls", "Walls", "rec/2.webm").with_duration(12);

        // Saved out of creation order
        store.save_recording(&second).unwrap();
        store.save_recording(&first).unwrap();
        assert!(is_dirty(store.as_ref(), id), "{name}");

        let keys: Vec<String> = store
            .get_recordings(id)
            .unwrap()
            .into_iter()
            .map(|rec| rec.item_key)
            .collect();
        assert_eq!(keys, vec!["hall.floor", "hall.walls"], "{name}");

        store.mark_recording_synced(&first.id).unwrap();
        let unsynced = store.get_unsynced_recordings(id).unwrap();
        assert_eq!(unsynced.len(), 1, "{name}");
        assert_eq!(unsynced[0].id, second.id, "{name}");
        assert_eq!(unsynced[0].duration, 12, "{name}");
    }
}

#[test]
fn saving_always_starts_unsynced() {
    for (name, store) in backends() {
        let id = InspectionId::new(6);
        let mut rec = Recording::new(id, "k", "l", "p");
        rec.synced = true;
        store.save_recording(&rec).unwrap();

        assert_eq!(store.get_unsynced_recordings(id).unwrap().len(), 1, "{name}");
    }
}

#[test]
fn resaving_a_synced_recording_is_a_no_op() {
    for (name, store) in backends() {
        let id = store.save_inspection(&json!({ "id": 6 })).unwrap();
        let rec = Recording::new(id, "k", "Original", "rec/a.webm");
        store.save_recording(&rec).unwrap();
        store.mark_recording_synced(&rec.id).unwrap();
        store.mark_inspection_synced(id).unwrap();

        let mut edited = rec.clone();
        edited.label = "Edited".to_string();
        store.save_recording(&edited).unwrap();

        let stored = store.get_recordings(id).unwrap();
        assert_eq!(stored.len(), 1, "{name}");
        assert_eq!(stored[0].label, "Original", "{name}");
        assert!(stored[0].synced, "{name}");
        assert!(!is_dirty(store.as_ref(), id), "{name}");
    }
}

#[test]
fn resaving_an_unsynced_photo_replaces_it() {
    for (name, store) in backends() {
        let id = InspectionId::new(6);
        let photo = Photo::new(id, "kitchen", "sink", "photos/1.jpg");
        store.save_photo(&photo).unwrap();

        let mut moved = photo.clone();
        moved.file_path = "photos/1b.jpg".to_string();
        store.save_photo(&moved).unwrap();

        let photos = store.get_photos(id, "kitchen", "sink").unwrap();
        assert_eq!(photos.len(), 1, "{name}");
        assert_eq!(photos[0].file_path, "photos/1b.jpg", "{name}");
    }
}

#[test]
fn photos_are_scoped_to_section_item() {
    for (name, store) in backends() {
        let id = store.save_inspection(&json!({ "id": 8 })).unwrap();
        let sink = Photo::new(id, "kitchen", "sink", "photos/1.jpg");
        pause();
        let sink_again = Photo::new(id, "kitchen", "sink", "photos/2.jpg");
        let hob = Photo::new(id, "kitchen", "hob", "photos/3.jpg");
        for photo in [&sink_again, &hob, &sink] {
            store.save_photo(photo).unwrap();
        }
        assert!(is_dirty(store.as_ref(), id), "{name}");

        let paths: Vec<String> = store
            .get_photos(id, "kitchen", "sink")
            .unwrap()
            .into_iter()
            .map(|photo| photo.file_path)
            .collect();
        assert_eq!(paths, vec!["photos/1.jpg", "photos/2.jpg"], "{name}");

        store.mark_photo_synced(&hob.id).unwrap();
        assert_eq!(store.get_unsynced_photos(id).unwrap().len(), 2, "{name}");
    }
}

#[test]
fn delete_inspection_cascades_to_every_table() {
    for (name, store) in backends() {
        let id = store.save_inspection(&json!({ "id": 12 })).unwrap();
        let other = store.save_inspection(&json!({ "id": 13 })).unwrap();
        store.save_report_data(id, &json!({ "rooms": 3 })).unwrap();
        store
            .save_recording(&Recording::new(id, "k", "l", "rec.webm"))
            .unwrap();
        store
            .save_photo(&Photo::new(id, "s", "i", "photo.jpg"))
            .unwrap();
        store
            .enqueue_sync_item(id, SyncItemKind::Status, &json!({}))
            .unwrap();
        store.save_report_data(other, &json!({ "rooms": 1 })).unwrap();

        store.delete_inspection(id).unwrap();

        assert!(store.get_inspection(id).unwrap().is_none(), "{name}");
        assert_eq!(store.get_report_data(id).unwrap(), json!({}), "{name}");
        assert!(store.get_recordings(id).unwrap().is_empty(), "{name}");
        assert!(store.get_photos(id, "s", "i").unwrap().is_empty(), "{name}");
        assert!(store.list_sync_items(Some(id)).unwrap().is_empty(), "{name}");

        // Siblings are untouched
        assert!(store.get_inspection(other).unwrap().is_some(), "{name}");
        assert_eq!(store.get_pending_sync_items(Some(other)).unwrap().len(), 1, "{name}");
    }
}
