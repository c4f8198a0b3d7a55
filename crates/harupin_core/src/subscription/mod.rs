//! Subscription coordination between filters, zoom and clustering.
//!
//! # Responsibility
//! - Give each map view an observer that re-derives clusters whenever the
//!   note set, the filter, or the zoom changes.
//! - Define the UI events the rendering layer passes through unchanged.

pub mod hub;

pub use hub::{ClusterUpdate, MapObserver, ObserverState, SubscriptionHub};

use crate::cluster::NoteCluster;
use crate::model::note::{GeoPoint, NoteId};
use serde::{Deserialize, Serialize};

/// Marker taps reported by the rendering layer. Not computed by the core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MapEvent {
    NoteTapped { note_id: NoteId },
    ClusterTapped { centroid: GeoPoint },
}

impl MapEvent {
    /// Event a tap on `cluster` produces: a pin for one member, a cluster otherwise.
    pub fn for_tap(cluster: &NoteCluster) -> Self {
        match cluster.members.as_slice() {
            [note] => Self::NoteTapped { note_id: note.id },
            _ => Self::ClusterTapped {
                centroid: cluster.centroid,
            },
        }
    }
}
