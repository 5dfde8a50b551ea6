use serde::{Deserialize, Serialize};

use crate::geometry::{WGS84_A_KM, WGS84_E2};

/// Fixed geodetic ground observer. Constant for a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObserverLocation {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    #[serde(default)]
    pub altitude_m: f64,
}

impl Default for ObserverLocation {
    fn default() -> Self {
        // NTPU campus, the reference site of the handover studies
        Self {
            latitude_deg: 24.9442,
            longitude_deg: 121.3714,
            altitude_m: 0.0,
        }
    }
}

impl ObserverLocation {
    pub fn new(latitude_deg: f64, longitude_deg: f64, altitude_m: f64) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
            altitude_m,
        }
    }

    pub fn lat_rad(&self) -> f64 {
        self.latitude_deg.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.longitude_deg.to_radians()
    }

    pub fn position_ecef_km(&self) -> [f64; 3] {
        let lat = self.lat_rad();
        let lon = self.lon_rad();
        let sin_lat = lat.sin();
        let cos_lat = lat.cos();
        let n = WGS84_A_KM / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
        let alt_km = self.altitude_m / 1000.0;
        [
            (n + alt_km) * cos_lat * lon.cos(),
            (n + alt_km) * cos_lat * lon.sin(),
            (n * (1.0 - WGS84_E2) + alt_km) * sin_lat,
        ]
    }

    /// Geodetic local vertical in ECEF.
    pub fn up_unit(&self) -> [f64; 3] {
        let lat = self.lat_rad();
        let lon = self.lon_rad();
        [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
    }
}
