//! Geospatial model: great-circle distance, initial bearing and the kinematic
//! position update used by the movement simulator.
//!
//! All coordinates are WGS84 degrees. Distances are metres. Inputs are assumed
//! finite and in range; NaN handling is the caller's responsibility.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Metres covered by one degree of latitude (flat approximation).
pub const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// A vehicle within this distance of its target counts as arrived.
pub const ARRIVAL_EPSILON_M: f64 = 5.0;

/// Radius inside which pickup confirmation and completion are granted.
pub const PROXIMITY_THRESHOLD_M: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lng)
    }
}

/// Haversine distance between two coordinates in metres.
pub fn distance_m(a: Coordinate, b: Coordinate) -> f64 {
    let (lat1, lon1) = (a.lat.to_radians(), a.lng.to_radians());
    let (lat2, lon2) = (b.lat.to_radians(), b.lng.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlon = (dlon * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Initial great-circle bearing from `a` to `b`, in degrees within `[0, 360)`.
pub fn bearing_deg(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlon = (b.lng - a.lng).to_radians();
    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    let normalized = y.atan2(x).to_degrees().rem_euclid(360.0);
    // rem_euclid can round a tiny negative input up to exactly 360.0
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}

/// Moves `position` toward `target` at `speed_mps` for `elapsed_secs`.
///
/// Returns `position` unchanged when it is already within
/// [`ARRIVAL_EPSILON_M`] of the target. Arrival is detected by the caller
/// through [`distance_m`], not through this function. The step never exceeds
/// the remaining distance.
pub fn advance(position: Coordinate, target: Coordinate, speed_mps: f64, elapsed_secs: f64) -> Coordinate {
    let remaining = distance_m(position, target);
    if remaining <= ARRIVAL_EPSILON_M {
        return position;
    }

    let step_m = (speed_mps * elapsed_secs).max(0.0).min(remaining);
    let heading = bearing_deg(position, target).to_radians();
    let north_m = step_m * heading.cos();
    let east_m = step_m * heading.sin();

    let lat_deg_per_m = 1.0 / METERS_PER_DEGREE_LAT;
    let lng_deg_per_m = 1.0 / (METERS_PER_DEGREE_LAT * position.lat.to_radians().cos());

    Coordinate {
        lat: position.lat + north_m * lat_deg_per_m,
        lng: position.lng + east_m * lng_deg_per_m,
    }
}

/// Eight-point compass label for a bearing in degrees.
pub fn compass_point(bearing: f64) -> &'static str {
    const POINTS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
    let sector = ((bearing.rem_euclid(360.0) + 22.5) / 45.0).floor() as usize % 8;
    POINTS[sector]
}

/// Converts a speed in km/h into metres per second.
pub fn kmh_to_mps(speed_kmh: f64) -> f64 {
    speed_kmh * 1000.0 / 3600.0
}
