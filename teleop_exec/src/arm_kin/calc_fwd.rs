//! Forward kinematics calculation
//!
//! The chain is composed directly: lift translation, then arm extension
//! translation, then the wrist yaw/pitch/roll rotation, then the fixed tool
//! offset out to the grip centre.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Translation3, UnitQuaternion, Vector3};

// Internal
use super::{ArmConfig, ArmKin, Pose};

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ArmKin {
    /// Compute the grip-centre pose for the given joint values.
    ///
    /// Pure function of the joint values and the static model.
    pub(crate) fn calc_forward(&self, config: &ArmConfig) -> Pose {
        // Wrist root: extension along base x, lift along base z
        let wrist_root = Vector3::new(
            self.params.arm_mount_offset_m + config.arm_ext_m,
            0.0,
            self.base_height_m + config.lift_m,
        );

        // Wrist rotation, fixed composition order Rz(yaw) * Ry(pitch) * Rx(roll)
        let rot = UnitQuaternion::from_euler_angles(
            config.wrist_roll_rad,
            config.wrist_pitch_rad,
            config.wrist_yaw_rad,
        );

        // Grip centre sits out along the rotated tool x axis
        let grip_centre = wrist_root + rot * Vector3::new(self.params.tool_offset_m, 0.0, 0.0);

        Pose::from_parts(Translation3::from(grip_centre), rot)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::super::{params::test_params, Kinematics};
    use super::*;

    #[test]
    fn test_forward_zero_config() {
        let kin = ArmKin::new(test_params()).unwrap();

        let pose = kin.forward(&ArmConfig::default());

        // At zero the grip centre is mount offset + tool offset along x, at
        // the lift base height
        assert!((pose.translation.x - (0.26 + 0.23)).abs() < 1e-12);
        assert!(pose.translation.y.abs() < 1e-12);
        assert!((pose.translation.z - 0.19).abs() < 1e-12);
        assert!(pose.rotation.angle() < 1e-12);
    }

    #[test]
    fn test_forward_lift_and_extension() {
        let kin = ArmKin::new(test_params()).unwrap();

        let config = ArmConfig {
            lift_m: 0.5,
            arm_ext_m: 0.3,
            ..ArmConfig::default()
        };

        let pose = kin.forward(&config);

        assert!((pose.translation.x - (0.26 + 0.3 + 0.23)).abs() < 1e-12);
        assert!((pose.translation.z - (0.19 + 0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_forward_yaw_quarter_turn() {
        let kin = ArmKin::new(test_params()).unwrap();

        let config = ArmConfig {
            wrist_yaw_rad: std::f64::consts::FRAC_PI_2,
            ..ArmConfig::default()
        };

        let pose = kin.forward(&config);

        // Tool offset swings from +x to +y, the wrist root stays on x
        assert!((pose.translation.x - 0.26).abs() < 1e-12);
        assert!((pose.translation.y - 0.23).abs() < 1e-12);
    }

    #[test]
    fn test_forward_ground_mode_base_height() {
        let mut params = test_params();
        params.ground_mode = true;
        let kin = ArmKin::new(params).unwrap();

        let pose = kin.forward(&ArmConfig::default());

        assert!((pose.translation.z - 0.05).abs() < 1e-12);
    }
}
