//! Viewport zoom to clustering threshold mapping.

use serde::{Deserialize, Serialize};

/// Upper bound for any derived threshold (half a great circle).
const MAX_THRESHOLD_DEGREES: f64 = 180.0;

/// Deterministic zoom → threshold mapping.
///
/// At or above `max_clustering_zoom` the threshold is 0 and nothing merges.
/// Below it the threshold starts at `base_threshold_degrees` and, when
/// `double_per_zoom_level` is set, doubles for every further level zoomed out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdPolicy {
    pub max_clustering_zoom: f64,
    pub base_threshold_degrees: f64,
    pub double_per_zoom_level: bool,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            max_clustering_zoom: 14.0,
            base_threshold_degrees: 0.02,
            double_per_zoom_level: true,
        }
    }
}

impl ThresholdPolicy {
    /// Step function: `base_threshold_degrees` below the cutoff, 0 above.
    pub fn fixed(max_clustering_zoom: f64, base_threshold_degrees: f64) -> Self {
        Self {
            max_clustering_zoom,
            base_threshold_degrees,
            double_per_zoom_level: false,
        }
    }

    /// Returns the clustering threshold, in degrees, for `zoom`.
    ///
    /// Non-finite zoom levels map to 0.
    pub fn threshold_for_zoom(&self, zoom: f64) -> f64 {
        if !zoom.is_finite()
            || zoom >= self.max_clustering_zoom
            || self.base_threshold_degrees.is_nan()
            || self.base_threshold_degrees <= 0.0
        {
            return 0.0;
        }
        if !self.double_per_zoom_level {
            return self.base_threshold_degrees.min(MAX_THRESHOLD_DEGREES);
        }
        let levels_out = (self.max_clustering_zoom - 1.0 - zoom).max(0.0);
        (self.base_threshold_degrees * levels_out.exp2()).min(MAX_THRESHOLD_DEGREES)
    }

    /// Checks that the policy can produce meaningful thresholds.
    pub fn validate(&self) -> Result<(), String> {
        if !self.max_clustering_zoom.is_finite() {
            return Err("max_clustering_zoom must be finite".to_string());
        }
        if !self.base_threshold_degrees.is_finite() || self.base_threshold_degrees < 0.0 {
            return Err(format!(
                "base_threshold_degrees must be a finite non-negative number, got {}",
                self.base_threshold_degrees
            ));
        }
        Ok(())
    }
}
