use std::f64::consts::PI;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::geometry::{EARTH_MU_KM3_S2, EARTH_RADIUS_KM};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Raw TLE text as handed over by the acquisition side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TleSource {
    /// Identifier used in error reports, usually a file name.
    pub name: String,
    pub text: String,
}

impl TleSource {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Orbital elements of one satellite, validated at parse time.
#[derive(Debug, Clone, Serialize)]
pub struct OrbitalElementSet {
    pub norad_id: u64,
    pub name: String,
    pub constellation: String,
    pub origin: String,
    pub line_number: usize,
    /// Calculation base time for every propagation of this satellite.
    pub epoch: DateTime<Utc>,
    pub mean_motion_rev_day: f64,
    pub inclination_deg: f64,
    pub eccentricity: f64,
    pub argument_of_perigee_deg: f64,
    pub raan_deg: f64,
    pub mean_anomaly_deg: f64,
    pub drag_term: f64,
    #[serde(skip)]
    pub(crate) elements: sgp4::Elements,
}

impl OrbitalElementSet {
    pub(crate) fn from_elements(
        elements: sgp4::Elements,
        epoch: DateTime<Utc>,
        constellation: &str,
        origin: &str,
        line_number: usize,
    ) -> Self {
        let name = elements
            .object_name
            .clone()
            .unwrap_or_else(|| format!("NORAD {}", elements.norad_id));
        Self {
            norad_id: elements.norad_id,
            name,
            constellation: constellation.to_string(),
            origin: origin.to_string(),
            line_number,
            epoch,
            mean_motion_rev_day: elements.mean_motion,
            inclination_deg: elements.inclination,
            eccentricity: elements.eccentricity,
            argument_of_perigee_deg: elements.argument_of_perigee,
            raan_deg: elements.right_ascension,
            mean_anomaly_deg: elements.mean_anomaly,
            drag_term: elements.drag_term,
            elements,
        }
    }

    pub fn elements(&self) -> &sgp4::Elements {
        &self.elements
    }

    pub fn period_minutes(&self) -> f64 {
        1440.0 / self.mean_motion_rev_day
    }

    pub fn semi_major_axis_km(&self) -> f64 {
        let n_rad_s = self.mean_motion_rev_day * 2.0 * PI / SECONDS_PER_DAY;
        (EARTH_MU_KM3_S2 / (n_rad_s * n_rad_s)).cbrt()
    }

    /// Mean altitude above the equatorial radius.
    pub fn altitude_km(&self) -> f64 {
        self.semi_major_axis_km() - EARTH_RADIUS_KM
    }
}
