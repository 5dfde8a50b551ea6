//! Synthetic TLE fixtures for unit tests.
//!
//! The reference orbit is circular at 550 km, inclined 53°, with RAAN and mean
//! anomaly chosen so that at its epoch (2024 day 100.5) the satellite sits
//! above the observer at 24.9442°N 121.3714°E.

use crate::geometry::ObserverLocation;
use crate::tle::{checksum, parse_sources, OrbitalElementSet, TleSource};

pub(crate) const ROUND_TRIP_LINE1: &str =
    "1 99001U 24001A   24100.50000000  .00000000  00000+0  00000+0 0  9996";
pub(crate) const ROUND_TRIP_LINE2: &str =
    "2 99001  53.0000 119.0784 0000001   0.0000  31.8751 15.05490646    16";

pub(crate) fn round_trip_record() -> String {
    format!("TEST-550\n{}\n{}\n", ROUND_TRIP_LINE1, ROUND_TRIP_LINE2)
}

pub(crate) fn observer() -> ObserverLocation {
    ObserverLocation::new(24.9442, 121.3714, 0.0)
}

pub(crate) fn with_checksum(body: &str) -> String {
    format!("{}{}", body, checksum(body))
}

#[derive(Debug, Clone)]
pub(crate) struct SyntheticOrbit {
    pub norad_id: u64,
    pub inclination_deg: f64,
    pub raan_deg: f64,
    pub eccentricity: f64,
    pub argument_of_perigee_deg: f64,
    pub mean_anomaly_deg: f64,
    pub mean_motion: f64,
    pub epoch: &'static str,
}

impl SyntheticOrbit {
    pub fn starlink_like(norad_id: u64) -> Self {
        Self {
            norad_id,
            inclination_deg: 53.0,
            raan_deg: 119.0784,
            eccentricity: 1e-7,
            argument_of_perigee_deg: 0.0,
            mean_anomaly_deg: 31.8751,
            mean_motion: 15.05490646,
            epoch: "24100.50000000",
        }
    }

    /// 1200 km, 87.9° orbit over the same observer at the same epoch.
    pub fn oneweb_like(norad_id: u64) -> Self {
        Self {
            norad_id,
            inclination_deg: 87.9,
            raan_deg: 138.6187,
            eccentricity: 1e-7,
            argument_of_perigee_deg: 0.0,
            mean_anomaly_deg: 24.9621,
            mean_motion: 13.16009679,
            epoch: "24100.50000000",
        }
    }

    /// Near-equatorial orbit that never rises above the observer's horizon.
    pub fn equatorial(norad_id: u64) -> Self {
        Self {
            inclination_deg: 0.5,
            ..Self::starlink_like(norad_id)
        }
    }

    pub fn with_mean_anomaly(mut self, mean_anomaly_deg: f64) -> Self {
        self.mean_anomaly_deg = mean_anomaly_deg.rem_euclid(360.0);
        self
    }

    pub fn with_epoch(mut self, epoch: &'static str) -> Self {
        self.epoch = epoch;
        self
    }

    pub fn with_mean_motion(mut self, mean_motion: f64) -> Self {
        self.mean_motion = mean_motion;
        self
    }

    pub fn lines(&self) -> (String, String) {
        let line1 = with_checksum(&format!(
            "1 {:05}U 24001A   {}  .00000000  00000+0  00000+0 0  999",
            self.norad_id, self.epoch
        ));
        let line2 = with_checksum(&format!(
            "2 {:05} {:8.4} {:8.4} {:07} {:8.4} {:8.4} {:11.8}{:5}",
            self.norad_id,
            self.inclination_deg,
            self.raan_deg,
            (self.eccentricity * 1e7).round() as u64,
            self.argument_of_perigee_deg,
            self.mean_anomaly_deg,
            self.mean_motion,
            1
        ));
        (line1, line2)
    }

    pub fn record(&self, name: &str) -> String {
        let (line1, line2) = self.lines();
        format!("{}\n{}\n{}\n", name, line1, line2)
    }

    pub fn element_set(&self, constellation: &str) -> OrbitalElementSet {
        let source = TleSource::new("fixture", self.record(&format!("SAT-{}", self.norad_id)));
        let mut outcome = parse_sources(constellation, &[source]);
        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        outcome.elements.remove(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_matches_reference_lines() {
        let (line1, line2) = SyntheticOrbit::starlink_like(99001).lines();
        assert_eq!(line1, ROUND_TRIP_LINE1);
        assert_eq!(line2, ROUND_TRIP_LINE2);
    }
}
