//! Filtered live views over the note store.
//!
//! # Responsibility
//! - Map user-facing filter criteria onto store predicates.
//! - Expose the matching set as a continuously updated, ordered snapshot.
//! - Index the years and months that have notes.

pub mod archive;
pub mod criteria;
pub mod engine;
