//! Live note queries driven by filter criteria.
//!
//! # Responsibility
//! - Translate `FilterCriteria` into a store live query.
//! - Apply the favorites post-filter and the date/time ordering contract.
//! - Keep the last known-good set visible, flagged as degraded, when the
//!   store reports a failure.
//!
//! # Invariants
//! - The current set is replaced by assigning a new `Arc<NoteSet>`; it is never
//!   mutated in place.
//! - Once `NoteQuery::cancel` returns (or the query is dropped), neither the
//!   holder nor the callback is touched again.
//! - Identical consecutive sets are emitted once.

use super::criteria::FilterCriteria;
use crate::model::note::Note;
use crate::store::{LiveQueryHandle, NotesSink, RecordStore, StoreResult};
use log::{info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Freshness of a delivered set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryStatus {
    Fresh,
    /// The store failed; `notes` are the last known-good set.
    Degraded(String),
}

/// One immutable snapshot of the notes matching a query.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteSet {
    /// Sorted by `date DESC, time DESC, id DESC`.
    pub notes: Vec<Note>,
    pub status: QueryStatus,
}

impl NoteSet {
    pub fn is_degraded(&self) -> bool {
        matches!(self.status, QueryStatus::Degraded(_))
    }
}

type ChangeCallback = Arc<dyn Fn(Arc<NoteSet>) + Send + Sync>;

struct QueryState {
    active: bool,
    current: Option<Arc<NoteSet>>,
}

/// Builds live note queries over one record store.
#[derive(Clone)]
pub struct QueryEngine {
    store: Arc<dyn RecordStore>,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Starts a live query for `criteria`.
    ///
    /// `on_change` receives every new set, starting with the initial one
    /// (delivered before this returns when the store answers synchronously).
    /// The callback runs under the query's holder lock and must not call back
    /// into the returned `NoteQuery`.
    ///
    /// # Errors
    /// - Returns the store error when the live query cannot be established.
    pub fn observe<F>(&self, criteria: FilterCriteria, on_change: F) -> StoreResult<NoteQuery>
    where
        F: Fn(Arc<NoteSet>) + Send + Sync + 'static,
    {
        let state = Arc::new(Mutex::new(QueryState {
            active: true,
            current: None,
        }));
        let on_change: ChangeCallback = Arc::new(on_change);

        let sink: NotesSink = {
            let state = Arc::clone(&state);
            let criteria = criteria.clone();
            let on_change = Arc::clone(&on_change);
            Arc::new(move |result: StoreResult<Vec<Note>>| {
                let mut guard = lock(&state);
                if !guard.active {
                    return;
                }
                let next = match result {
                    Ok(mut notes) => {
                        criteria.post_filter(&mut notes);
                        sort_notes(&mut notes);
                        NoteSet {
                            notes,
                            status: QueryStatus::Fresh,
                        }
                    }
                    Err(err) => {
                        warn!(
                            "event=query_degraded module=query status=error predicate={} error={}",
                            criteria.predicate().kind(),
                            err
                        );
                        NoteSet {
                            notes: guard
                                .current
                                .as_ref()
                                .map(|set| set.notes.clone())
                                .unwrap_or_default(),
                            status: QueryStatus::Degraded(err.to_string()),
                        }
                    }
                };
                replace_and_emit(&mut guard, next, on_change.as_ref());
            })
        };

        let handle = self.store.live_query(criteria.predicate(), sink)?;
        info!(
            "event=query_observe module=query status=ok predicate={} favorites_only={}",
            criteria.predicate().kind(),
            criteria.favorites_only
        );
        Ok(NoteQuery {
            criteria,
            state,
            on_change,
            handle: Some(handle),
        })
    }
}

/// Running live query. Cancels on drop.
pub struct NoteQuery {
    criteria: FilterCriteria,
    state: Arc<Mutex<QueryState>>,
    on_change: ChangeCallback,
    handle: Option<LiveQueryHandle>,
}

impl NoteQuery {
    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Latest set, or `None` before the first delivery.
    pub fn current(&self) -> Option<Arc<NoteSet>> {
        lock(&self.state).current.clone()
    }

    /// Explicitly empties the visible set, keeping its freshness status.
    pub fn clear(&self) {
        let mut guard = lock(&self.state);
        if !guard.active {
            return;
        }
        let status = guard
            .current
            .as_ref()
            .map(|set| set.status.clone())
            .unwrap_or(QueryStatus::Fresh);
        replace_and_emit(
            &mut guard,
            NoteSet {
                notes: Vec::new(),
                status,
            },
            self.on_change.as_ref(),
        );
    }

    /// Stops deliveries and releases the store registration.
    pub fn cancel(self) {}

    fn deactivate(&mut self) {
        lock(&self.state).active = false;
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
    }
}

impl Drop for NoteQuery {
    fn drop(&mut self) {
        self.deactivate();
    }
}

fn replace_and_emit(
    state: &mut QueryState,
    next: NoteSet,
    on_change: &(dyn Fn(Arc<NoteSet>) + Send + Sync),
) {
    if state.current.as_deref() == Some(&next) {
        return;
    }
    let next = Arc::new(next);
    state.current = Some(Arc::clone(&next));
    on_change(next);
}

/// Sorts by date, then time, then id, all descending. The order is total, so
/// it does not depend on how the store happened to deliver the rows.
pub fn sort_notes(notes: &mut [Note]) {
    notes.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| b.time.cmp(&a.time))
            .then_with(|| b.id.cmp(&a.id))
    });
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
