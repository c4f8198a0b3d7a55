//! Note use-case service.
//!
//! # Responsibility
//! - Provide create/update/delete/favorite APIs with read-back semantics.
//! - Keep callers decoupled from the concrete record store.
//!
//! # Invariants
//! - `update_note` uses full-record replacement semantics.
//! - Every successful write is visible to live queries before it returns.

use crate::model::note::{Note, NoteDraft, NoteId, NoteValidationError};
use crate::store::{RecordStore, StoreError, StoreResult};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Service error for note use-cases.
#[derive(Debug)]
pub enum NoteServiceError {
    /// Input rejected before persistence.
    Validation(NoteValidationError),
    /// Target note does not exist.
    NoteNotFound(NoteId),
    /// Persistence-layer failure.
    Store(StoreError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent note state: {details}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for NoteServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(id) => Self::NoteNotFound(id),
            StoreError::Validation(err) => Self::Validation(err),
            other => Self::Store(other),
        }
    }
}

/// Note service facade over a record store.
#[derive(Clone)]
pub struct NoteService {
    store: Arc<dyn RecordStore>,
}

impl NoteService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Inserts `draft` and returns the persisted record.
    pub fn create_note(&self, draft: &NoteDraft) -> Result<Note, NoteServiceError> {
        let id = self.store.insert(draft)?;
        self.store
            .get_by_id(id)?
            .ok_or(NoteServiceError::InconsistentState(
                "created note not found in read-back",
            ))
    }

    /// Replaces the full record keyed by `note.id`.
    pub fn update_note(&self, note: &Note) -> Result<Note, NoteServiceError> {
        self.store.update(note)?;
        self.store
            .get_by_id(note.id)?
            .ok_or(NoteServiceError::InconsistentState(
                "updated note not found in read-back",
            ))
    }

    pub fn delete_note(&self, id: NoteId) -> Result<(), NoteServiceError> {
        self.store.delete(id)?;
        Ok(())
    }

    pub fn get_note(&self, id: NoteId) -> StoreResult<Option<Note>> {
        self.store.get_by_id(id)
    }

    pub fn set_favorite(&self, id: NoteId, favorite: bool) -> Result<(), NoteServiceError> {
        self.store.set_favorite(id, favorite)?;
        Ok(())
    }

    /// Flips the favorite flag and returns the updated record.
    pub fn toggle_favorite(&self, id: NoteId) -> Result<Note, NoteServiceError> {
        let current = self
            .store
            .get_by_id(id)?
            .ok_or(NoteServiceError::NoteNotFound(id))?;
        self.store.set_favorite(id, !current.is_favorite)?;
        self.store
            .get_by_id(id)?
            .ok_or(NoteServiceError::InconsistentState(
                "note missing after favorite toggle",
            ))
    }
}
