//! Parameters structure for the arm kinematic model

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::ArmKinError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the arm's kinematic model.
#[derive(Debug, Default, Deserialize)]
pub struct Params {
    // ---- GEOMETRY ----

    /// Height of the lift's zero position above the base origin.
    ///
    /// Units: meters
    pub lift_base_height_m: f64,

    /// Alternate lift zero height used when manipulating on the ground.
    ///
    /// Units: meters
    pub lift_base_height_ground_m: f64,

    /// If true the alternate ground-manipulation base height is used.
    pub ground_mode: bool,

    /// Horizontal offset from the base origin to the wrist root at zero
    /// arm extension.
    ///
    /// Units: meters
    pub arm_mount_offset_m: f64,

    /// Offset from the wrist root to the grip centre, along the tool x axis.
    ///
    /// Units: meters
    pub tool_offset_m: f64,

    // ---- JOINT LIMITS ----

    /// Lift travel limits.
    ///
    /// Units: meters
    pub lift_min_m: f64,
    pub lift_max_m: f64,

    /// Arm extension travel limits.
    ///
    /// Units: meters
    pub arm_ext_min_m: f64,
    pub arm_ext_max_m: f64,

    /// Wrist yaw limits.
    ///
    /// Units: radians
    pub wrist_yaw_min_rad: f64,
    pub wrist_yaw_max_rad: f64,

    /// Wrist pitch limits.
    ///
    /// Units: radians
    pub wrist_pitch_min_rad: f64,
    pub wrist_pitch_max_rad: f64,

    /// Wrist roll limits.
    ///
    /// Units: radians
    pub wrist_roll_min_rad: f64,
    pub wrist_roll_max_rad: f64,

    // ---- NUMERICS ----

    /// Magnitude of cos(pitch) below which the wrist orientation is treated
    /// as singular and the previous yaw/roll split is held.
    pub singularity_cos_limit: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check the parameter set describes a usable model.
    pub fn validate(&self) -> Result<(), ArmKinError> {
        let finites: [(&'static str, f64); 7] = [
            ("lift_base_height_m", self.lift_base_height_m),
            ("lift_base_height_ground_m", self.lift_base_height_ground_m),
            ("arm_mount_offset_m", self.arm_mount_offset_m),
            ("tool_offset_m", self.tool_offset_m),
            ("lift_min_m", self.lift_min_m),
            ("arm_ext_min_m", self.arm_ext_min_m),
            ("singularity_cos_limit", self.singularity_cos_limit),
        ];

        for (name, value) in finites.iter() {
            if !value.is_finite() {
                return Err(ArmKinError::NonFiniteParam(name));
            }
        }

        let limits: [(&'static str, f64, f64); 5] = [
            ("lift", self.lift_min_m, self.lift_max_m),
            ("arm extension", self.arm_ext_min_m, self.arm_ext_max_m),
            ("wrist yaw", self.wrist_yaw_min_rad, self.wrist_yaw_max_rad),
            (
                "wrist pitch",
                self.wrist_pitch_min_rad,
                self.wrist_pitch_max_rad,
            ),
            (
                "wrist roll",
                self.wrist_roll_min_rad,
                self.wrist_roll_max_rad,
            ),
        ];

        for (joint, min, max) in limits.iter() {
            if !min.is_finite() || !max.is_finite() || min >= max {
                return Err(ArmKinError::InvalidLimits {
                    joint,
                    min: *min,
                    max: *max,
                });
            }
        }

        if self.singularity_cos_limit <= 0.0 || self.singularity_cos_limit >= 1.0 {
            return Err(ArmKinError::InvalidSingularityLimit(
                self.singularity_cos_limit,
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TEST SUPPORT
// ---------------------------------------------------------------------------

/// A nominal parameter set used across the kinematics tests.
#[cfg(test)]
pub(crate) fn test_params() -> Params {
    Params {
        lift_base_height_m: 0.19,
        lift_base_height_ground_m: 0.05,
        ground_mode: false,
        arm_mount_offset_m: 0.26,
        tool_offset_m: 0.23,
        lift_min_m: 0.0,
        lift_max_m: 1.1,
        arm_ext_min_m: 0.0,
        arm_ext_max_m: 0.52,
        wrist_yaw_min_rad: -1.39,
        wrist_yaw_max_rad: 4.42,
        wrist_pitch_min_rad: -2.0,
        wrist_pitch_max_rad: 2.0,
        wrist_roll_min_rad: -3.14,
        wrist_roll_max_rad: 3.14,
        singularity_cos_limit: 0.015,
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn nominal() -> Params {
        test_params()
    }

    #[test]
    fn test_nominal_params_valid() {
        assert!(nominal().validate().is_ok());
    }

    #[test]
    fn test_inverted_limits_rejected() {
        let mut params = nominal();
        params.lift_min_m = 1.2;

        assert!(matches!(
            params.validate(),
            Err(ArmKinError::InvalidLimits { joint: "lift", .. })
        ));
    }

    #[test]
    fn test_non_finite_geometry_rejected() {
        let mut params = nominal();
        params.tool_offset_m = f64::NAN;

        assert!(matches!(
            params.validate(),
            Err(ArmKinError::NonFiniteParam("tool_offset_m"))
        ));
    }

    #[test]
    fn test_singularity_limit_range() {
        let mut params = nominal();
        params.singularity_cos_limit = 1.5;

        assert!(matches!(
            params.validate(),
            Err(ArmKinError::InvalidSingularityLimit(_))
        ));
    }
}
