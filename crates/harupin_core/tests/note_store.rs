mod common;

use common::draft;
use harupin_core::{
    Note, NotePredicate, NoteValidationError, NotesSink, RecordStore, SqliteRecordStore,
    StoreError, StoreResult,
};
use std::sync::{Arc, Mutex};

type Deliveries = Arc<Mutex<Vec<StoreResult<Vec<Note>>>>>;

fn recording_sink() -> (NotesSink, Deliveries) {
    let deliveries: Deliveries = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&deliveries);
    let sink: NotesSink = Arc::new(move |result: StoreResult<Vec<Note>>| {
        recorded.lock().unwrap().push(result);
    });
    (sink, deliveries)
}

fn delivered_titles(deliveries: &Deliveries) -> Vec<Vec<String>> {
    deliveries
        .lock()
        .unwrap()
        .iter()
        .map(|result| {
            result
                .as_ref()
                .unwrap()
                .iter()
                .map(|note| note.title.clone())
                .collect()
        })
        .collect()
}

#[test]
fn insert_then_get_by_id_returns_persisted_note() {
    let store = SqliteRecordStore::open_in_memory().unwrap();
    let draft = draft("Lunch", "2025-06-01", "12:30", 37.5665, 126.978)
        .with_location_name("City Hall")
        .with_body("bibimbap");

    let id = store.insert(&draft).unwrap();
    let note = store.get_by_id(id).unwrap().unwrap();

    assert_eq!(note.id, id);
    assert_eq!(note.title, "Lunch");
    assert_eq!(note.body, "bibimbap");
    assert_eq!(note.location_name, "City Hall");
    assert_eq!(note.latitude, 37.5665);
    assert_eq!(note.longitude, 126.978);
    assert!(!note.is_favorite);
}

#[test]
fn image_slots_round_trip_in_order() {
    let store = SqliteRecordStore::open_in_memory().unwrap();
    let mut draft = draft("Photos", "2025-06-01", "12:30", 10.0, 10.0);
    draft.image_uris = vec!["content://a".to_string(), "content://b".to_string()];

    let id = store.insert(&draft).unwrap();
    let note = store.get_by_id(id).unwrap().unwrap();

    assert_eq!(note.image_uris, vec!["content://a", "content://b"]);
}

#[test]
fn update_replaces_full_record() {
    let store = SqliteRecordStore::open_in_memory().unwrap();
    let id = store
        .insert(&draft("Before", "2025-06-01", "09:00", 1.0, 2.0))
        .unwrap();
    let mut note = store.get_by_id(id).unwrap().unwrap();
    note.title = "After".to_string();
    note.latitude = -33.8688;
    note.longitude = 151.2093;
    note.is_favorite = true;

    store.update(&note).unwrap();

    assert_eq!(store.get_by_id(id).unwrap().unwrap(), note);
}

#[test]
fn writes_against_unknown_ids_return_not_found() {
    let store = SqliteRecordStore::open_in_memory().unwrap();
    let missing = draft("Ghost", "2025-06-01", "09:00", 1.0, 2.0).into_note(404);

    assert!(matches!(store.update(&missing), Err(StoreError::NotFound(404))));
    assert!(matches!(store.delete(404), Err(StoreError::NotFound(404))));
    assert!(matches!(
        store.set_favorite(404, true),
        Err(StoreError::NotFound(404))
    ));
    assert!(store.get_by_id(404).unwrap().is_none());
}

#[test]
fn malformed_coordinates_are_rejected_and_not_stored() {
    let store = SqliteRecordStore::open_in_memory().unwrap();
    let (sink, deliveries) = recording_sink();
    let _handle = store.live_query(NotePredicate::All, sink).unwrap();

    for (lat, lng) in [(91.0, 0.0), (0.0, -180.5), (f64::NAN, 0.0)] {
        let err = store
            .insert(&draft("Bad", "2025-06-01", "09:00", lat, lng))
            .unwrap_err();
        assert!(err.is_malformed_coordinate(), "unexpected error: {err}");
    }

    let id = store
        .insert(&draft("Good", "2025-06-01", "09:00", 90.0, -180.0))
        .unwrap();
    let mut note = store.get_by_id(id).unwrap().unwrap();
    note.longitude = 200.0;
    assert!(matches!(
        store.update(&note),
        Err(StoreError::Validation(NoteValidationError::MalformedCoordinate { .. }))
    ));

    assert_eq!(
        delivered_titles(&deliveries),
        vec![Vec::<String>::new(), vec!["Good".to_string()]]
    );
}

#[test]
fn deleted_ids_are_never_reused() {
    let store = SqliteRecordStore::open_in_memory().unwrap();
    let first = store
        .insert(&draft("One", "2025-06-01", "09:00", 1.0, 1.0))
        .unwrap();
    store.delete(first).unwrap();
    let second = store
        .insert(&draft("Two", "2025-06-01", "09:00", 1.0, 1.0))
        .unwrap();

    assert!(second > first);
}

#[test]
fn live_query_orders_by_date_then_time_descending() {
    let store = SqliteRecordStore::open_in_memory().unwrap();
    store
        .insert(&draft("old", "2024-12-31", "23:59", 1.0, 1.0))
        .unwrap();
    store
        .insert(&draft("morning", "2025-06-01", "08:00", 1.0, 1.0))
        .unwrap();
    store
        .insert(&draft("evening", "2025-06-01", "20:00", 1.0, 1.0))
        .unwrap();

    let (sink, deliveries) = recording_sink();
    let _handle = store.live_query(NotePredicate::All, sink).unwrap();

    assert_eq!(
        delivered_titles(&deliveries),
        vec![vec![
            "evening".to_string(),
            "morning".to_string(),
            "old".to_string()
        ]]
    );
}

#[test]
fn keyword_query_tracks_insert_and_delete() {
    let store = SqliteRecordStore::open_in_memory().unwrap();
    let (sink, deliveries) = recording_sink();
    let _handle = store
        .live_query(NotePredicate::KeywordSubstring("Gyeong".to_string()), sink)
        .unwrap();

    let id = store
        .insert(&draft("Gyeongbokgung", "2025-06-01", "10:00", 37.5796, 126.9769))
        .unwrap();
    store.delete(id).unwrap();

    assert_eq!(
        delivered_titles(&deliveries),
        vec![
            Vec::<String>::new(),
            vec!["Gyeongbokgung".to_string()],
            Vec::<String>::new(),
        ]
    );
}

#[test]
fn keyword_matches_location_label_case_sensitively() {
    let store = SqliteRecordStore::open_in_memory().unwrap();
    store
        .insert(
            &draft("Walk", "2025-06-01", "10:00", 37.5796, 126.9769)
                .with_location_name("Gyeongbokgung"),
        )
        .unwrap();

    let (upper_sink, upper) = recording_sink();
    let _upper = store
        .live_query(NotePredicate::KeywordSubstring("Gyeong".to_string()), upper_sink)
        .unwrap();
    let (lower_sink, lower) = recording_sink();
    let _lower = store
        .live_query(NotePredicate::KeywordSubstring("gyeong".to_string()), lower_sink)
        .unwrap();

    assert_eq!(delivered_titles(&upper), vec![vec!["Walk".to_string()]]);
    assert_eq!(delivered_titles(&lower), vec![Vec::<String>::new()]);
}

#[test]
fn date_prefix_selects_only_matching_month() {
    let store = SqliteRecordStore::open_in_memory().unwrap();
    store
        .insert(&draft("june", "2025-06-01", "10:00", 1.0, 1.0))
        .unwrap();
    store
        .insert(&draft("july", "2025-07-01", "10:00", 1.0, 1.0))
        .unwrap();

    let (sink, deliveries) = recording_sink();
    let _handle = store
        .live_query(NotePredicate::DatePrefix("2025-06".to_string()), sink)
        .unwrap();

    assert_eq!(delivered_titles(&deliveries), vec![vec!["june".to_string()]]);
}

#[test]
fn unrelated_writes_do_not_redeliver() {
    let store = SqliteRecordStore::open_in_memory().unwrap();
    let (sink, deliveries) = recording_sink();
    let _handle = store
        .live_query(NotePredicate::DatePrefix("2025-06".to_string()), sink)
        .unwrap();

    store
        .insert(&draft("july", "2025-07-01", "10:00", 1.0, 1.0))
        .unwrap();

    assert_eq!(deliveries.lock().unwrap().len(), 1);
}

#[test]
fn cancelled_live_query_stops_deliveries() {
    let store = SqliteRecordStore::open_in_memory().unwrap();
    let (sink, deliveries) = recording_sink();
    let handle = store.live_query(NotePredicate::All, sink).unwrap();
    assert_eq!(store.live_query_count(), 1);

    handle.cancel();
    assert_eq!(store.live_query_count(), 0);

    store
        .insert(&draft("after", "2025-06-01", "10:00", 1.0, 1.0))
        .unwrap();
    assert_eq!(deliveries.lock().unwrap().len(), 1);
}

#[test]
fn dropping_handle_releases_registration() {
    let store = SqliteRecordStore::open_in_memory().unwrap();
    let (sink, _deliveries) = recording_sink();
    {
        let _handle = store.live_query(NotePredicate::All, sink).unwrap();
        assert_eq!(store.live_query_count(), 1);
    }
    assert_eq!(store.live_query_count(), 0);
}

#[test]
fn file_backed_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.db");

    let id = {
        let store = SqliteRecordStore::open(&path).unwrap();
        store
            .insert(&draft("kept", "2025-06-01", "10:00", 35.0, 139.0))
            .unwrap()
    };

    let reopened = SqliteRecordStore::open(&path).unwrap();
    assert_eq!(reopened.get_by_id(id).unwrap().unwrap().title, "kept");
}

#[test]
fn four_digit_date_prefix_selects_whole_year() {
    let store = SqliteRecordStore::open_in_memory().unwrap();
    store
        .insert(&draft("winter", "2024-12-31", "23:00", 1.0, 1.0))
        .unwrap();
    store
        .insert(&draft("spring", "2025-03-01", "10:00", 1.0, 1.0))
        .unwrap();
    store
        .insert(&draft("summer", "2025-08-01", "10:00", 1.0, 1.0))
        .unwrap();

    let (sink, deliveries) = recording_sink();
    let _handle = store
        .live_query(NotePredicate::DatePrefix("2025".to_string()), sink)
        .unwrap();

    assert_eq!(
        delivered_titles(&deliveries),
        vec![vec!["summer".to_string(), "spring".to_string()]]
    );
}

#[test]
fn empty_keyword_matches_every_note() {
    let store = SqliteRecordStore::open_in_memory().unwrap();
    store
        .insert(&draft("untitled", "2025-06-01", "10:00", 1.0, 1.0))
        .unwrap();
    store
        .insert(
            &draft("Palace", "2025-06-02", "10:00", 37.5796, 126.9769)
                .with_location_name("Gyeongbokgung"),
        )
        .unwrap();

    let (sink, deliveries) = recording_sink();
    let _handle = store
        .live_query(NotePredicate::KeywordSubstring(String::new()), sink)
        .unwrap();

    assert_eq!(
        delivered_titles(&deliveries),
        vec![vec!["Palace".to_string(), "untitled".to_string()]]
    );
}
