//! Parameters structure for the goal generator

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Isometry3, Quaternion, Translation3, UnitQuaternion};
use serde::Deserialize;

use super::GoalGenError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for goal generation.
#[derive(Debug, Default, Deserialize)]
pub struct Params {
    // ---- SMOOTHING ----

    /// Time constant of the position smoothing filter.
    ///
    /// Units: seconds
    pub pos_filter_tau_s: f64,

    /// Time constant of the orientation smoothing filter.
    ///
    /// Units: seconds
    pub rot_filter_tau_s: f64,

    /// Time constant of the aperture smoothing filter.
    ///
    /// Units: seconds
    pub aperture_filter_tau_s: f64,

    // ---- LOSS OF TRACK ----

    /// Number of consecutive ticks without any tong marker after which the
    /// goal is invalidated.
    pub loss_tick_limit: u32,

    // ---- DEGRADED MODE ----

    /// Offset from a single visible tong to the grip centre, applied along
    /// the last known inter-tong axis.
    ///
    /// Units: meters
    pub single_tong_offset_m: f64,

    // ---- MAPPING ----

    /// If true the base-frame y components of the fused goal are mirrored,
    /// for left-handed operation.
    pub mirrored: bool,

    /// Fixed calibration data from the offline calibration collaborator.
    pub calibration: CalibParams,
}

/// Calibration values loaded once at startup and never mutated.
#[derive(Debug, Default, Deserialize)]
pub struct CalibParams {
    /// Translation of the camera frame origin in the base frame.
    ///
    /// Units: meters
    pub cam_to_base_pos_m: [f64; 3],

    /// Rotation from camera frame to base frame, as \[w, i, j, k\].
    pub cam_to_base_quat_wijk: [f64; 4],

    /// Inter-marker distance at which the gripper is fully closed.
    ///
    /// Units: meters
    pub grip_closed_dist_m: f64,

    /// Inter-marker distance at which the gripper is fully open.
    ///
    /// Units: meters
    pub grip_open_dist_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check the parameter set and build the camera-to-base transform.
    pub fn validate(&self) -> Result<Isometry3<f64>, GoalGenError> {
        let taus: [(&'static str, f64); 3] = [
            ("pos_filter_tau_s", self.pos_filter_tau_s),
            ("rot_filter_tau_s", self.rot_filter_tau_s),
            ("aperture_filter_tau_s", self.aperture_filter_tau_s),
        ];

        for (name, tau) in taus.iter() {
            if !tau.is_finite() || *tau < 0.0 {
                return Err(GoalGenError::InvalidTimeConstant(name, *tau));
            }
        }

        if self.loss_tick_limit == 0 {
            return Err(GoalGenError::InvalidLossTickLimit);
        }

        let c = &self.calibration;

        if !(c.grip_closed_dist_m.is_finite()
            && c.grip_open_dist_m.is_finite()
            && c.grip_closed_dist_m > 0.0
            && c.grip_closed_dist_m < c.grip_open_dist_m)
        {
            return Err(GoalGenError::InvalidGripDistances {
                closed: c.grip_closed_dist_m,
                open: c.grip_open_dist_m,
            });
        }

        c.to_isometry()
    }
}

impl CalibParams {
    /// Build the camera-to-base isometry from the raw calibration values.
    pub fn to_isometry(&self) -> Result<Isometry3<f64>, GoalGenError> {
        if self.cam_to_base_pos_m.iter().any(|v| !v.is_finite())
            || self.cam_to_base_quat_wijk.iter().any(|v| !v.is_finite())
        {
            return Err(GoalGenError::InvalidCalibTransform);
        }

        let q = Quaternion::new(
            self.cam_to_base_quat_wijk[0],
            self.cam_to_base_quat_wijk[1],
            self.cam_to_base_quat_wijk[2],
            self.cam_to_base_quat_wijk[3],
        );

        let rot = match UnitQuaternion::try_new(q, 1e-6) {
            Some(r) => r,
            None => return Err(GoalGenError::InvalidCalibTransform),
        };

        Ok(Isometry3::from_parts(
            Translation3::new(
                self.cam_to_base_pos_m[0],
                self.cam_to_base_pos_m[1],
                self.cam_to_base_pos_m[2],
            ),
            rot,
        ))
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn nominal() -> Params {
        Params {
            pos_filter_tau_s: 0.1,
            rot_filter_tau_s: 0.1,
            aperture_filter_tau_s: 0.05,
            loss_tick_limit: 10,
            single_tong_offset_m: 0.04,
            mirrored: false,
            calibration: CalibParams {
                cam_to_base_pos_m: [0.0, 0.0, 0.0],
                cam_to_base_quat_wijk: [1.0, 0.0, 0.0, 0.0],
                grip_closed_dist_m: 0.03,
                grip_open_dist_m: 0.12,
            },
        }
    }

    #[test]
    fn test_nominal_valid() {
        assert!(nominal().validate().is_ok());
    }

    #[test]
    fn test_closed_above_open_rejected() {
        let mut params = nominal();
        params.calibration.grip_closed_dist_m = 0.2;

        assert!(matches!(
            params.validate(),
            Err(GoalGenError::InvalidGripDistances { .. })
        ));
    }

    #[test]
    fn test_zero_quaternion_rejected() {
        let mut params = nominal();
        params.calibration.cam_to_base_quat_wijk = [0.0; 4];

        assert!(matches!(
            params.validate(),
            Err(GoalGenError::InvalidCalibTransform)
        ));
    }

    #[test]
    fn test_zero_loss_limit_rejected() {
        let mut params = nominal();
        params.loss_tick_limit = 0;

        assert!(matches!(
            params.validate(),
            Err(GoalGenError::InvalidLossTickLimit)
        ));
    }
}
