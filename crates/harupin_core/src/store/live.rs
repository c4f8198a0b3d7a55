//! Live query registry shared by store implementations.
//!
//! # Invariants
//! - A registration receives a set only when it differs from the last set
//!   delivered to it (failures reset that memory).
//! - Removed registrations are never selected for delivery again.

use super::{LiveQueryHandle, NotePredicate, NotesSink};
use crate::model::note::Note;
use log::debug;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

struct Registration {
    predicate: NotePredicate,
    sink: NotesSink,
    last_delivered: Option<Vec<Note>>,
}

/// Snapshot entry handed to the publisher outside the registry lock.
pub(super) struct PendingDelivery {
    pub id: u64,
    pub predicate: NotePredicate,
    pub sink: NotesSink,
}

#[derive(Default)]
pub(super) struct LiveRegistry {
    next_id: u64,
    entries: BTreeMap<u64, Registration>,
}

impl LiveRegistry {
    pub fn register(&mut self, predicate: NotePredicate, sink: NotesSink) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.entries.insert(
            id,
            Registration {
                predicate,
                sink,
                last_delivered: None,
            },
        );
        id
    }

    pub fn remove(&mut self, id: u64) -> bool {
        self.entries.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn pending(&self) -> Vec<PendingDelivery> {
        self.entries
            .iter()
            .map(|(id, registration)| PendingDelivery {
                id: *id,
                predicate: registration.predicate.clone(),
                sink: Arc::clone(&registration.sink),
            })
            .collect()
    }

    /// Records `notes` as delivered to `id` and returns whether they should be
    /// pushed (still registered and different from the previous delivery).
    pub fn accept(&mut self, id: u64, notes: &[Note]) -> bool {
        let Some(registration) = self.entries.get_mut(&id) else {
            return false;
        };
        if registration.last_delivered.as_deref() == Some(notes) {
            return false;
        }
        registration.last_delivered = Some(notes.to_vec());
        true
    }

    /// Forgets the last delivery so the next successful query is pushed.
    pub fn accept_failure(&mut self, id: u64) -> bool {
        match self.entries.get_mut(&id) {
            Some(registration) => {
                registration.last_delivered = None;
                true
            }
            None => false,
        }
    }
}

/// Builds a handle whose cancel removes `id` from `registry` if it still exists.
pub(super) fn handle_for(registry: &Arc<Mutex<LiveRegistry>>, id: u64) -> LiveQueryHandle {
    let registry: Weak<Mutex<LiveRegistry>> = Arc::downgrade(registry);
    LiveQueryHandle::new(move || {
        if let Some(registry) = registry.upgrade() {
            let mut guard = registry.lock().unwrap_or_else(PoisonError::into_inner);
            let removed = guard.remove(id);
            debug!(
                "event=live_query_cancel module=store status=ok live_query_id={} removed={} remaining={}",
                id,
                removed,
                guard.len()
            );
        }
    })
}

#[cfg(test)]
mod tests {
    use super::LiveRegistry;
    use crate::model::note::{GeoPoint, Note, NoteDraft};
    use crate::store::{NotePredicate, StoreResult};
    use std::sync::Arc;

    #[test]
    fn accept_skips_identical_sets_and_removed_entries() {
        let mut registry = LiveRegistry::default();
        let id = registry.register(
            NotePredicate::All,
            Arc::new(|_: StoreResult<Vec<Note>>| {}),
        );
        let notes = vec![
            NoteDraft::new("a", "2025-06-01", "10:00", GeoPoint::new(1.0, 2.0)).into_note(1),
        ];

        assert!(registry.accept(id, &notes));
        assert!(!registry.accept(id, &notes));
        assert!(registry.accept_failure(id));
        assert!(registry.accept(id, &notes));

        assert!(registry.remove(id));
        assert!(!registry.accept(id, &[]));
        assert!(registry.pending().is_empty());
    }
}
