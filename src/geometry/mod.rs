//! Topocentric geometry: observer position and TEME → local horizon look
//! angles.

mod observer;
mod transform;
mod types;

pub use observer::ObserverLocation;
pub use transform::{
    ecef_to_enu, look_angles, observe, sidereal_angle, teme_to_ecef_position,
    teme_to_ecef_velocity, LookAngles,
};
pub use types::TopocentricObservation;

pub const EARTH_ROTATION_RAD_S: f64 = 7.292_115e-5;
pub const EARTH_RADIUS_KM: f64 = 6378.137;
pub const EARTH_MU_KM3_S2: f64 = 398_600.4418;

// WGS-84
pub(crate) const WGS84_A_KM: f64 = EARTH_RADIUS_KM;
pub(crate) const WGS84_E2: f64 = 0.006_694_379_990_14;
