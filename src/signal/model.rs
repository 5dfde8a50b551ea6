use serde::{Deserialize, Serialize};

use crate::geometry::EARTH_RADIUS_KM;

/// Elevation floor for the cosecant atmospheric model.
const MIN_ATMOSPHERIC_ELEVATION_DEG: f64 = 1.0;

/// Downlink band of one constellation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Band {
    pub frequency_ghz: f64,
    pub eirp_dbw: f64,
    pub zenith_attenuation_db: f64,
}

impl Band {
    pub fn ku(eirp_dbw: f64) -> Self {
        Self {
            frequency_ghz: 12.0,
            eirp_dbw,
            zenith_attenuation_db: 0.5,
        }
    }
}

impl Default for Band {
    fn default() -> Self {
        Self::ku(37.5)
    }
}

/// User terminal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Receiver {
    pub antenna_gain_dbi: f64,
    pub misc_losses_db: f64,
}

impl Default for Receiver {
    fn default() -> Self {
        Self {
            antenna_gain_dbi: 25.0,
            misc_losses_db: 2.0,
        }
    }
}

/// Free-space plus atmospheric downlink budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkBudget {
    pub band: Band,
    pub receiver: Receiver,
}

impl LinkBudget {
    pub fn new(band: Band, receiver: Receiver) -> Self {
        Self { band, receiver }
    }

    /// Received power in dBm over a known slant range.
    pub fn rsrp_dbm(&self, slant_range_km: f64, elevation_deg: f64) -> f64 {
        self.band.eirp_dbw + 30.0 + self.receiver.antenna_gain_dbi
            - free_space_path_loss_db(slant_range_km, self.band.frequency_ghz)
            - atmospheric_loss_db(self.band.zenith_attenuation_db, elevation_deg)
            - self.receiver.misc_losses_db
    }

    /// Received power for a satellite at `altitude_km` seen at `elevation_deg`.
    pub fn rsrp_at_elevation(&self, altitude_km: f64, elevation_deg: f64) -> f64 {
        self.rsrp_dbm(slant_range_km(altitude_km, elevation_deg), elevation_deg)
    }
}

/// Spherical-Earth distance to a satellite at `altitude_km` seen at
/// `elevation_deg`.
pub fn slant_range_km(altitude_km: f64, elevation_deg: f64) -> f64 {
    let r = EARTH_RADIUS_KM;
    let e = elevation_deg.to_radians();
    let orbit = r + altitude_km;
    let r_cos = r * e.cos();
    (orbit * orbit - r_cos * r_cos).sqrt() - r * e.sin()
}

pub fn free_space_path_loss_db(distance_km: f64, frequency_ghz: f64) -> f64 {
    20.0 * distance_km.log10() + 20.0 * frequency_ghz.log10() + 92.45
}

/// Cosecant law: zenith attenuation scaled by the air mass.
pub fn atmospheric_loss_db(zenith_attenuation_db: f64, elevation_deg: f64) -> f64 {
    let e = elevation_deg.max(MIN_ATMOSPHERIC_ELEVATION_DEG).to_radians();
    zenith_attenuation_db / e.sin()
}
