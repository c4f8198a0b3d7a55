//! Great-circle geometry in degrees.

use crate::model::note::GeoPoint;

/// Haversine central angle between two points, in degrees.
///
/// Pole/antimeridian wraparound is not special-cased.
pub fn angular_distance_degrees(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos()
            * b.latitude.to_radians().cos()
            * (d_lng / 2.0).sin().powi(2);
    // Rounding can push `h` a hair past 1 for antipodal points.
    let h = h.clamp(0.0, 1.0);
    (2.0 * h.sqrt().atan2((1.0 - h).sqrt())).to_degrees()
}
