#![allow(dead_code)]

use harupin_core::db::DbError;
use harupin_core::{
    GeoPoint, LiveQueryHandle, Note, NoteDraft, NoteId, NotePredicate, NotesSink, RecordStore,
    StoreError, StoreResult,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub fn draft(title: &str, date: &str, time: &str, latitude: f64, longitude: f64) -> NoteDraft {
    NoteDraft::new(title, date, time, GeoPoint::new(latitude, longitude))
}

pub fn note(id: NoteId, title: &str, date: &str, latitude: f64, longitude: f64) -> Note {
    draft(title, date, "12:00", latitude, longitude).into_note(id)
}

struct ManualSubscription {
    predicate: NotePredicate,
    sink: NotesSink,
    cancelled: Arc<AtomicBool>,
}

#[derive(Default)]
struct ManualState {
    notes: Vec<Note>,
    next_id: NoteId,
    subscriptions: Vec<ManualSubscription>,
}

/// Store whose live queries only deliver when the test says so.
///
/// Cancelled subscriptions keep their sinks so tests can replay a delivery
/// that was already in flight when the cancel happened.
#[derive(Default)]
pub struct ManualStore {
    state: Mutex<ManualState>,
}

impl ManualStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, notes: Vec<Note>) {
        let mut state = self.state.lock().unwrap();
        state.next_id = notes.iter().map(|note| note.id).max().unwrap_or(0);
        state.notes = notes;
    }

    pub fn active_subscriptions(&self) -> usize {
        let state = self.state.lock().unwrap();
        state
            .subscriptions
            .iter()
            .filter(|subscription| !subscription.cancelled.load(Ordering::SeqCst))
            .count()
    }

    /// Pushes the current matching set to every sink registered for `predicate`,
    /// cancelled or not.
    pub fn deliver(&self, predicate: &NotePredicate) {
        let deliveries: Vec<(NotesSink, Vec<Note>)> = {
            let state = self.state.lock().unwrap();
            state
                .subscriptions
                .iter()
                .filter(|subscription| &subscription.predicate == predicate)
                .map(|subscription| {
                    let notes = state
                        .notes
                        .iter()
                        .filter(|note| predicate.matches(note))
                        .cloned()
                        .collect();
                    (Arc::clone(&subscription.sink), notes)
                })
                .collect()
        };
        for (sink, notes) in deliveries {
            sink(Ok(notes));
        }
    }

    /// Pushes a `StoreUnavailable` failure to every sink registered for `predicate`.
    pub fn fail(&self, predicate: &NotePredicate) {
        let sinks: Vec<NotesSink> = {
            let state = self.state.lock().unwrap();
            state
                .subscriptions
                .iter()
                .filter(|subscription| &subscription.predicate == predicate)
                .map(|subscription| Arc::clone(&subscription.sink))
                .collect()
        };
        for sink in sinks {
            sink(Err(StoreError::Unavailable(DbError::Sqlite(
                rusqlite::Error::InvalidQuery,
            ))));
        }
    }
}

impl RecordStore for ManualStore {
    fn insert(&self, draft: &NoteDraft) -> StoreResult<NoteId> {
        draft.validate()?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        state.notes.push(draft.clone().into_note(id));
        Ok(id)
    }

    fn update(&self, note: &Note) -> StoreResult<()> {
        note.validate()?;
        let mut state = self.state.lock().unwrap();
        let slot = state
            .notes
            .iter_mut()
            .find(|existing| existing.id == note.id)
            .ok_or(StoreError::NotFound(note.id))?;
        *slot = note.clone();
        Ok(())
    }

    fn delete(&self, id: NoteId) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        let before = state.notes.len();
        state.notes.retain(|note| note.id != id);
        if state.notes.len() == before {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    fn set_favorite(&self, id: NoteId, favorite: bool) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        let note = state
            .notes
            .iter_mut()
            .find(|note| note.id == id)
            .ok_or(StoreError::NotFound(id))?;
        note.is_favorite = favorite;
        Ok(())
    }

    fn get_by_id(&self, id: NoteId) -> StoreResult<Option<Note>> {
        let state = self.state.lock().unwrap();
        Ok(state.notes.iter().find(|note| note.id == id).cloned())
    }

    fn live_query(
        &self,
        predicate: NotePredicate,
        sink: NotesSink,
    ) -> StoreResult<LiveQueryHandle> {
        let cancelled = Arc::new(AtomicBool::new(false));
        self.state
            .lock()
            .unwrap()
            .subscriptions
            .push(ManualSubscription {
                predicate,
                sink,
                cancelled: Arc::clone(&cancelled),
            });
        Ok(LiveQueryHandle::new(move || {
            cancelled.store(true, Ordering::SeqCst);
        }))
    }
}
