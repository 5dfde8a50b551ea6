use chrono::Duration;
use sgp4::{Constants, MinutesSinceEpoch};

use crate::geometry::EARTH_RADIUS_KM;
use crate::propagate::error::PropagationError;
use crate::propagate::types::{ReferenceFrame, StateVector, TimeGrid};
use crate::tle::OrbitalElementSet;

/// Below this a satellite completes fewer orbits per day than the LEO upper
/// altitude bound (~2000 km) allows.
pub const MIN_LEO_MEAN_MOTION: f64 = 11.25;

/// Propagate one satellite across the grid. Offsets are added to the
/// satellite's own TLE epoch; the result is time-ordered.
pub fn propagate(
    set: &OrbitalElementSet,
    grid: &TimeGrid,
) -> Result<Vec<StateVector>, PropagationError> {
    check_elements(set)?;

    let constants =
        Constants::from_elements(set.elements()).map_err(|e| PropagationError::Elements {
            norad_id: set.norad_id,
            message: e.to_string(),
        })?;

    grid.offsets()
        .iter()
        .map(|&offset_seconds| {
            let prediction = constants
                .propagate(MinutesSinceEpoch(offset_seconds / 60.0))
                .map_err(|e| PropagationError::Diverged {
                    norad_id: set.norad_id,
                    offset_seconds,
                    message: e.to_string(),
                })?;

            let state = StateVector {
                norad_id: set.norad_id,
                timestamp: set.epoch + offset_duration(offset_seconds),
                offset_seconds,
                position_km: prediction.position,
                velocity_km_s: prediction.velocity,
                frame: ReferenceFrame::Teme,
            };
            check_state(&state)?;
            Ok(state)
        })
        .collect()
}

fn check_elements(set: &OrbitalElementSet) -> Result<(), PropagationError> {
    let degenerate = |reason: &str| PropagationError::Degenerate {
        norad_id: set.norad_id,
        reason: reason.to_string(),
    };

    let n = set.mean_motion_rev_day;
    if !n.is_finite() || n <= 0.0 {
        return Err(degenerate("mean motion must be positive"));
    }
    if !(0.0..1.0).contains(&set.eccentricity) {
        return Err(degenerate("eccentricity outside [0, 1)"));
    }
    if n < MIN_LEO_MEAN_MOTION {
        return Err(PropagationError::UnsupportedRegime {
            norad_id: set.norad_id,
            mean_motion: n,
        });
    }
    Ok(())
}

fn check_state(state: &StateVector) -> Result<(), PropagationError> {
    let finite = state
        .position_km
        .iter()
        .chain(state.velocity_km_s.iter())
        .all(|v| v.is_finite());
    if !finite {
        return Err(PropagationError::Diverged {
            norad_id: state.norad_id,
            offset_seconds: state.offset_seconds,
            message: "non-finite state vector".to_string(),
        });
    }

    let radius_km = state.radius_km();
    if radius_km < EARTH_RADIUS_KM {
        return Err(PropagationError::Decayed {
            norad_id: state.norad_id,
            offset_seconds: state.offset_seconds,
            radius_km,
        });
    }
    Ok(())
}

fn offset_duration(offset_seconds: f64) -> Duration {
    Duration::microseconds((offset_seconds * 1e6).round() as i64)
}
