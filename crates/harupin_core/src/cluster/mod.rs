//! Distance-threshold clustering for map markers.
//!
//! # Responsibility
//! - Provide the pure, synchronous clustering pass over visible notes.
//! - Map viewport zoom levels onto clustering thresholds.
//!
//! # Invariants
//! - Distances and thresholds are angular and expressed in degrees everywhere.
//! - Nothing in this module performs I/O or keeps state between calls.

pub mod engine;
pub mod geo;
pub mod zoom;

pub use engine::{cluster, CameraTarget, Cluster, Located};
pub use geo::angular_distance_degrees;
pub use zoom::ThresholdPolicy;

/// Clusters of notes, as delivered to the map.
pub type NoteCluster = Cluster<crate::model::note::Note>;
