//! Domain model for geotagged notes.
//!
//! # Responsibility
//! - Define canonical data structures used by store, query and cluster layers.
//!
//! # Invariants
//! - Every persisted note is identified by a store-assigned `NoteId`.
//! - Coordinates are validated before they can reach clustering.

pub mod note;
