use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::geometry::ObserverLocation;

/// Look angles of one satellite at one timepoint, derived 1:1 from a
/// `StateVector`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopocentricObservation {
    pub norad_id: u64,
    pub timestamp: DateTime<Utc>,
    pub offset_seconds: f64,
    /// Negative below the local horizon.
    pub elevation_deg: f64,
    pub azimuth_deg: f64,
    pub range_km: f64,
    pub range_rate_km_s: f64,
    pub observer: ObserverLocation,
}
