//! Record store contracts.
//!
//! # Responsibility
//! - Define the keyed note store capability consumed by query/subscription layers.
//! - Define live-query predicates, delivery sinks and cancellation handles.
//! - Map persistence failures onto a small semantic error taxonomy.
//!
//! # Invariants
//! - Write paths validate notes before any SQL mutation.
//! - Every committed write is pushed to live queries without polling.
//! - After `LiveQueryHandle::cancel` returns, the registration is gone.

use crate::db::DbError;
use crate::model::note::{Note, NoteDraft, NoteId, NoteValidationError};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

mod live;
pub mod sqlite;

pub use sqlite::SqliteRecordStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store error taxonomy.
#[derive(Debug)]
pub enum StoreError {
    /// Note rejected before persistence (includes malformed coordinates).
    Validation(NoteValidationError),
    /// Insert/update/delete failed. Not retried automatically.
    Write(DbError),
    /// Update/delete/favorite targeted an unknown id.
    NotFound(NoteId),
    /// Read or live-query path is broken.
    Unavailable(DbError),
    /// Persisted row could not be decoded.
    InvalidData(String),
}

impl StoreError {
    /// Returns whether this error describes an out-of-range coordinate.
    pub fn is_malformed_coordinate(&self) -> bool {
        matches!(
            self,
            Self::Validation(NoteValidationError::MalformedCoordinate { .. })
        )
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Write(err) => write!(f, "store write failed: {err}"),
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::Unavailable(err) => write!(f, "store unavailable: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted note data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Write(err) | Self::Unavailable(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<NoteValidationError> for StoreError {
    fn from(value: NoteValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Predicate descriptor understood by [`RecordStore::live_query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotePredicate {
    /// Every note.
    All,
    /// Case-sensitive substring of title or location label. Empty matches all.
    KeywordSubstring(String),
    /// Date string starts with the given prefix (`YYYY` or `YYYY-MM`).
    DatePrefix(String),
    /// Zero-or-one note with the given id.
    ById(NoteId),
}

impl NotePredicate {
    /// Short stable label used in log events.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::KeywordSubstring(_) => "keyword",
            Self::DatePrefix(_) => "date_prefix",
            Self::ById(_) => "by_id",
        }
    }

    /// In-memory evaluation, matching the SQL semantics of the SQLite store.
    pub fn matches(&self, note: &Note) -> bool {
        match self {
            Self::All => true,
            Self::KeywordSubstring(keyword) => {
                note.title.contains(keyword.as_str())
                    || note.location_name.contains(keyword.as_str())
            }
            Self::DatePrefix(prefix) => note.date.starts_with(prefix.as_str()),
            Self::ById(id) => note.id == *id,
        }
    }
}

/// Receives the full matching set on subscribe and after every relevant write.
pub type NotesSink = Arc<dyn Fn(StoreResult<Vec<Note>>) + Send + Sync>;

/// Live query registration. Cancels on drop.
pub struct LiveQueryHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl LiveQueryHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Releases the registration. The store stops delivering to its sink.
    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for LiveQueryHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for LiveQueryHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveQueryHandle")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Keyed note store with push-based live queries.
pub trait RecordStore: Send + Sync {
    /// Inserts a note and returns its store-assigned id.
    fn insert(&self, draft: &NoteDraft) -> StoreResult<NoteId>;
    /// Replaces the full record keyed by `note.id`.
    fn update(&self, note: &Note) -> StoreResult<()>;
    /// Removes the note with `id`.
    fn delete(&self, id: NoteId) -> StoreResult<()>;
    /// Sets only the favorite flag.
    fn set_favorite(&self, id: NoteId, favorite: bool) -> StoreResult<()>;
    /// One-shot lookup.
    fn get_by_id(&self, id: NoteId) -> StoreResult<Option<Note>>;
    /// Registers `sink` for `predicate`; the current set is delivered before
    /// this returns, later sets after every write that changes it.
    fn live_query(&self, predicate: NotePredicate, sink: NotesSink)
        -> StoreResult<LiveQueryHandle>;
}
