//! Greedy seed-anchored clustering.
//!
//! # Responsibility
//! - Group located items whose distance to a seed is below a threshold.
//! - Compute each group's centroid as the plain mean of its members.
//!
//! # Invariants
//! - Every input item appears in exactly one output cluster.
//! - Seeds are taken in input order; candidates are compared to the seed,
//!   never to an evolving centroid. Reordering the input may regroup items.
//! - Identical input and threshold produce identical output.
//! - The function is total: empty input, zero/negative/NaN thresholds and
//!   coincident points are all valid.

use super::geo::angular_distance_degrees;
use crate::model::note::{GeoPoint, Note};
use serde::Serialize;

/// Zoom levels added when a multi-member cluster is tapped.
pub const CLUSTER_TAP_ZOOM_STEP: f64 = 2.0;

/// Anything with a map position.
pub trait Located {
    fn position(&self) -> GeoPoint;
}

impl Located for Note {
    fn position(&self) -> GeoPoint {
        Note::position(self)
    }
}

impl Located for GeoPoint {
    fn position(&self) -> GeoPoint {
        *self
    }
}

/// One map marker worth of items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster<T> {
    /// Seed first, then absorbed items in input order.
    pub members: Vec<T>,
    pub centroid: GeoPoint,
}

/// Where the camera goes when a cluster marker is tapped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraTarget {
    pub center: GeoPoint,
    pub zoom: f64,
}

impl<T> Cluster<T> {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// A single-member cluster renders as a plain pin.
    pub fn is_single(&self) -> bool {
        self.members.len() == 1
    }

    /// Centers on the centroid and zooms in by [`CLUSTER_TAP_ZOOM_STEP`].
    pub fn camera_target(&self, current_zoom: f64) -> CameraTarget {
        CameraTarget {
            center: self.centroid,
            zoom: current_zoom + CLUSTER_TAP_ZOOM_STEP,
        }
    }
}

/// Clusters `items` in one greedy pass. O(n²) distance evaluations.
///
/// `threshold_degrees` is an angular distance; an item joins the current seed's
/// cluster when its distance to the seed is strictly below it.
pub fn cluster<T>(items: &[T], threshold_degrees: f64) -> Vec<Cluster<T>>
where
    T: Located + Clone,
{
    let mut consumed = vec![false; items.len()];
    let mut clusters = Vec::new();
    let merging = threshold_degrees > 0.0;

    for seed_index in 0..items.len() {
        if consumed[seed_index] {
            continue;
        }
        consumed[seed_index] = true;
        let seed = items[seed_index].position();
        let mut member_indices = vec![seed_index];

        if merging {
            for candidate in seed_index + 1..items.len() {
                if consumed[candidate] {
                    continue;
                }
                if angular_distance_degrees(seed, items[candidate].position()) < threshold_degrees {
                    consumed[candidate] = true;
                    member_indices.push(candidate);
                }
            }
        }

        let members: Vec<T> = member_indices
            .iter()
            .map(|&index| items[index].clone())
            .collect();
        let centroid = centroid_of(&members);
        clusters.push(Cluster { members, centroid });
    }

    clusters
}

fn centroid_of<T: Located>(members: &[T]) -> GeoPoint {
    let count = members.len() as f64;
    let (lat_sum, lng_sum) = members.iter().fold((0.0, 0.0), |(lat, lng), member| {
        let position = member.position();
        (lat + position.latitude, lng + position.longitude)
    });
    GeoPoint::new(lat_sum / count, lng_sum / count)
}
