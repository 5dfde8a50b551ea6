use chrono::{DateTime, Utc};

use crate::geometry::{ObserverLocation, TopocentricObservation, EARTH_ROTATION_RAD_S};
use crate::propagate::StateVector;

/// Greenwich sidereal angle (radians) at `timestamp`.
pub fn sidereal_angle(timestamp: &DateTime<Utc>) -> f64 {
    sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(&timestamp.naive_utc()))
}

/// Project a TEME state onto the observer's local horizon.
pub fn observe(state: &StateVector, observer: &ObserverLocation) -> TopocentricObservation {
    let gmst = sidereal_angle(&state.timestamp);
    let sat_ecef = teme_to_ecef_position(state.position_km, gmst);
    let sat_vel_ecef = teme_to_ecef_velocity(state.position_km, state.velocity_km_s, gmst);
    let look = look_angles(sat_ecef, sat_vel_ecef, observer);

    TopocentricObservation {
        norad_id: state.norad_id,
        timestamp: state.timestamp,
        offset_seconds: state.offset_seconds,
        elevation_deg: look.elevation_deg,
        azimuth_deg: look.azimuth_deg,
        range_km: look.range_km,
        range_rate_km_s: look.range_rate_km_s,
        observer: *observer,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookAngles {
    pub elevation_deg: f64,
    pub azimuth_deg: f64,
    pub range_km: f64,
    pub range_rate_km_s: f64,
}

/// Elevation, azimuth, range and range rate of an ECEF point seen from the
/// observer.
pub fn look_angles(
    sat_ecef: [f64; 3],
    sat_vel_ecef: [f64; 3],
    observer: &ObserverLocation,
) -> LookAngles {
    let sta_ecef = observer.position_ecef_km();
    let dr = [
        sat_ecef[0] - sta_ecef[0],
        sat_ecef[1] - sta_ecef[1],
        sat_ecef[2] - sta_ecef[2],
    ];
    let range_km = (dr[0] * dr[0] + dr[1] * dr[1] + dr[2] * dr[2]).sqrt();

    let (east, north, up) = ecef_to_enu(dr, observer.lat_rad(), observer.lon_rad());
    let azimuth_deg = east.atan2(north).to_degrees().rem_euclid(360.0);
    let (elevation_deg, range_rate_km_s) = if range_km > 0.0 {
        let sin_el = (up / range_km).clamp(-1.0, 1.0);
        let rate = (sat_vel_ecef[0] * dr[0] + sat_vel_ecef[1] * dr[1] + sat_vel_ecef[2] * dr[2])
            / range_km;
        (sin_el.asin().to_degrees(), rate)
    } else {
        (90.0, 0.0)
    };

    LookAngles {
        elevation_deg,
        azimuth_deg,
        range_km,
        range_rate_km_s,
    }
}

pub fn teme_to_ecef_position(pos_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    [
        pos_teme[0] * cos_gmst + pos_teme[1] * sin_gmst,
        -pos_teme[0] * sin_gmst + pos_teme[1] * cos_gmst,
        pos_teme[2],
    ]
}

pub fn teme_to_ecef_velocity(pos_teme: [f64; 3], vel_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    let pos = teme_to_ecef_position(pos_teme, gmst);
    let rotated = [
        vel_teme[0] * cos_gmst + vel_teme[1] * sin_gmst,
        -vel_teme[0] * sin_gmst + vel_teme[1] * cos_gmst,
        vel_teme[2],
    ];
    [
        rotated[0] + EARTH_ROTATION_RAD_S * pos[1],
        rotated[1] - EARTH_ROTATION_RAD_S * pos[0],
        rotated[2],
    ]
}

pub fn ecef_to_enu(dr: [f64; 3], lat_rad: f64, lon_rad: f64) -> (f64, f64, f64) {
    let sin_lat = lat_rad.sin();
    let cos_lat = lat_rad.cos();
    let sin_lon = lon_rad.sin();
    let cos_lon = lon_rad.cos();

    let east = -sin_lon * dr[0] + cos_lon * dr[1];
    let north = -sin_lat * cos_lon * dr[0] - sin_lat * sin_lon * dr[1] + cos_lat * dr[2];
    let up = cos_lat * cos_lon * dr[0] + cos_lat * sin_lon * dr[1] + sin_lat * dr[2];
    (east, north, up)
}
