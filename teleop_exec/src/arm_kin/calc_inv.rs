//! Inverse kinematics calculation
//!
//! Closed-form decomposition exploiting the joint layout: the wrist angles
//! come straight out of the target rotation (fixed Z-Y-X order), the lift is
//! the vertical component of the wrist root, and the extension is the
//! remaining horizontal range. No iteration anywhere.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{UnitQuaternion, Vector3};

// Internal
use super::{ArmConfig, ArmKin, JointFlags, JointTarget, Pose};
use util::maths::unwrap_near;

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Clamp a value to `[min, max]`, reporting whether clamping occured.
fn clamp_flag(value: f64, min: f64, max: f64) -> (f64, bool) {
    if value < min {
        (min, true)
    } else if value > max {
        (max, true)
    } else {
        (value, false)
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ArmKin {
    /// Solve a target grip-centre pose into a joint target.
    ///
    /// The seed carries the previous solution: extracted angles are unwrapped
    /// to the representative nearest the seed, and inside the gimbal-lock
    /// region the seed's yaw/roll split is held outright.
    pub(crate) fn calc_inverse(
        &self,
        target: &Pose,
        aperture: f64,
        seed: &ArmConfig,
    ) -> JointTarget {
        let p = &self.params;
        let mut limited = JointFlags::default();

        // ---- WRIST DECOMPOSITION ----

        // For R = Rz(yaw) * Ry(pitch) * Rx(roll):
        //   m00 = cy*cp    m10 = sy*cp    m20 = -sp
        //   m21 = cp*sr    m22 = cp*cr
        let m = target.rotation.to_rotation_matrix();

        // |cos(pitch)|, the denominator of the yaw/roll extraction
        let cos_pitch_mag = (m[(0, 0)].powi(2) + m[(1, 0)].powi(2)).sqrt();
        let singular = cos_pitch_mag < p.singularity_cos_limit;

        let pitch_raw = (-m[(2, 0)]).atan2(cos_pitch_mag);

        // In gimbal lock yaw and roll are no longer separable, hold the
        // seed's split rather than dividing by the vanishing denominator
        let (yaw_raw, roll_raw) = if singular {
            (seed.wrist_yaw_rad, seed.wrist_roll_rad)
        } else {
            (m[(1, 0)].atan2(m[(0, 0)]), m[(2, 1)].atan2(m[(2, 2)]))
        };

        // Canonical range, then continuity with the previous tick
        let yaw = unwrap_near(yaw_raw, seed.wrist_yaw_rad);
        let pitch = unwrap_near(pitch_raw, seed.wrist_pitch_rad);
        let roll = unwrap_near(roll_raw, seed.wrist_roll_rad);

        let (yaw, yaw_lim) = clamp_flag(yaw, p.wrist_yaw_min_rad, p.wrist_yaw_max_rad);
        let (pitch, pitch_lim) = clamp_flag(pitch, p.wrist_pitch_min_rad, p.wrist_pitch_max_rad);
        let (roll, roll_lim) = clamp_flag(roll, p.wrist_roll_min_rad, p.wrist_roll_max_rad);

        limited.wrist_yaw = yaw_lim;
        limited.wrist_pitch = pitch_lim;
        limited.wrist_roll = roll_lim;

        // ---- POSITION DECOMPOSITION ----

        // Walk back from the grip centre to the wrist root using the
        // orientation that will actually be commanded
        let rot_cmd = UnitQuaternion::from_euler_angles(roll, pitch, yaw);
        let wrist_root =
            target.translation.vector - rot_cmd * Vector3::new(p.tool_offset_m, 0.0, 0.0);

        // (1) lift from the vertical component
        let (lift, lift_lim) = clamp_flag(
            wrist_root.z - self.base_height_m,
            p.lift_min_m,
            p.lift_max_m,
        );
        limited.lift = lift_lim;

        // (2) extension from the remaining horizontal range
        let horizontal_range = (wrist_root.x.powi(2) + wrist_root.y.powi(2)).sqrt();
        let (arm_ext, ext_lim) = clamp_flag(
            horizontal_range - p.arm_mount_offset_m,
            p.arm_ext_min_m,
            p.arm_ext_max_m,
        );
        limited.arm_ext = ext_lim;

        // ---- GRIPPER ----

        let (gripper, gripper_lim) = clamp_flag(aperture, 0.0, 1.0);
        limited.gripper = gripper_lim;

        let reachable = !limited.any();

        JointTarget {
            config: ArmConfig {
                lift_m: lift,
                arm_ext_m: arm_ext,
                wrist_yaw_rad: yaw,
                wrist_pitch_rad: pitch,
                wrist_roll_rad: roll,
                gripper,
            },
            limited,
            reachable,
            singular,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::super::{params::test_params, Kinematics};
    use super::*;
    use nalgebra::Translation3;

    const TOL: f64 = 1e-9;

    fn config_close(a: &ArmConfig, b: &ArmConfig, tol: f64) -> bool {
        (a.lift_m - b.lift_m).abs() < tol
            && (a.arm_ext_m - b.arm_ext_m).abs() < tol
            && (a.wrist_yaw_rad - b.wrist_yaw_rad).abs() < tol
            && (a.wrist_pitch_rad - b.wrist_pitch_rad).abs() < tol
            && (a.wrist_roll_rad - b.wrist_roll_rad).abs() < tol
            && (a.gripper - b.gripper).abs() < tol
    }

    #[test]
    fn test_forward_inverse_round_trip() {
        let kin = ArmKin::new(test_params()).unwrap();

        let configs = [
            ArmConfig {
                lift_m: 0.6,
                arm_ext_m: 0.25,
                wrist_yaw_rad: 0.4,
                wrist_pitch_rad: -0.5,
                wrist_roll_rad: 1.1,
                gripper: 0.5,
            },
            ArmConfig {
                lift_m: 0.1,
                arm_ext_m: 0.5,
                wrist_yaw_rad: -1.2,
                wrist_pitch_rad: 0.9,
                wrist_roll_rad: -2.8,
                gripper: 0.0,
            },
            // Yaw beyond pi, only recoverable through the seed unwrap
            ArmConfig {
                lift_m: 0.9,
                arm_ext_m: 0.05,
                wrist_yaw_rad: 3.9,
                wrist_pitch_rad: 0.2,
                wrist_roll_rad: 0.0,
                gripper: 1.0,
            },
        ];

        for config in configs.iter() {
            let pose = kin.forward(config);
            let target = kin.inverse(&pose, config.gripper, config);

            assert!(
                config_close(&target.config, config, TOL),
                "round trip failed for {:?}, got {:?}",
                config,
                target.config
            );
            assert!(target.reachable);
            assert!(!target.singular);
        }
    }

    #[test]
    fn test_clamping_invariant() {
        let kin = ArmKin::new(test_params()).unwrap();
        let p = test_params();

        // Sweep a grid of poses, some reachable and some not
        for ix in 0..6 {
            for iz in 0..6 {
                let target = Pose::from_parts(
                    Translation3::new(0.2 * ix as f64, 0.0, -0.5 + 0.5 * iz as f64),
                    UnitQuaternion::identity(),
                );

                let solved = kin.inverse(&target, 0.5, &ArmConfig::default());
                let c = &solved.config;

                assert!(c.lift_m >= p.lift_min_m && c.lift_m <= p.lift_max_m);
                assert!(c.arm_ext_m >= p.arm_ext_min_m && c.arm_ext_m <= p.arm_ext_max_m);
                assert!(
                    c.wrist_yaw_rad >= p.wrist_yaw_min_rad
                        && c.wrist_yaw_rad <= p.wrist_yaw_max_rad
                );
                assert!(c.gripper >= 0.0 && c.gripper <= 1.0);

                // Reachable iff nothing was clamped
                assert_eq!(solved.reachable, !solved.limited.any());
            }
        }
    }

    #[test]
    fn test_out_of_reach_extension() {
        let kin = ArmKin::new(test_params()).unwrap();
        let p = test_params();

        // A pose 0.5 m beyond the fully extended arm
        let at_max = kin.forward(&ArmConfig {
            lift_m: 0.5,
            arm_ext_m: p.arm_ext_max_m,
            ..ArmConfig::default()
        });
        let target = Pose::from_parts(
            Translation3::new(
                at_max.translation.x + 0.5,
                at_max.translation.y,
                at_max.translation.z,
            ),
            at_max.rotation,
        );

        let solved = kin.inverse(&target, 0.5, &ArmConfig::default());

        // Extension clamps to max and only extension is flagged, the lift
        // and orientation still solve normally
        assert!((solved.config.arm_ext_m - p.arm_ext_max_m).abs() < TOL);
        assert!(!solved.reachable);
        assert!(solved.limited.arm_ext);
        assert!(!solved.limited.lift);
        assert!((solved.config.lift_m - 0.5).abs() < TOL);
        assert!(solved.config.wrist_yaw_rad.abs() < TOL);
    }

    #[test]
    fn test_singular_pitch_continuity() {
        let kin = ArmKin::new(test_params()).unwrap();

        let yaw = 0.3;
        let roll = -0.7;

        // Two consecutive targets straddling pitch = 90 deg
        let near = Pose::from_parts(
            Translation3::new(0.5, 0.0, 0.6),
            UnitQuaternion::from_euler_angles(roll, 89.9f64.to_radians(), yaw),
        );
        let past = Pose::from_parts(
            Translation3::new(0.5, 0.0, 0.6),
            UnitQuaternion::from_euler_angles(roll, 90.1f64.to_radians(), yaw),
        );

        let seed = ArmConfig {
            wrist_yaw_rad: yaw,
            wrist_roll_rad: roll,
            wrist_pitch_rad: 1.5,
            ..ArmConfig::default()
        };

        let first = kin.inverse(&near, 0.5, &seed);
        let second = kin.inverse(&past, 0.5, &first.config);

        assert!(first.singular);
        assert!(second.singular);

        // The yaw/roll split is held across the singular region, outputs
        // stay continuous rather than swinging by pi
        assert!((second.config.wrist_yaw_rad - first.config.wrist_yaw_rad).abs() < 0.01);
        assert!((second.config.wrist_roll_rad - first.config.wrist_roll_rad).abs() < 0.01);
        assert!((second.config.wrist_pitch_rad - first.config.wrist_pitch_rad).abs() < 0.05);
    }

    #[test]
    fn test_aperture_clamped() {
        let kin = ArmKin::new(test_params()).unwrap();
        let pose = kin.forward(&ArmConfig::default());

        let over = kin.inverse(&pose, 1.4, &ArmConfig::default());
        assert_eq!(over.config.gripper, 1.0);
        assert!(over.limited.gripper);

        let under = kin.inverse(&pose, -0.2, &ArmConfig::default());
        assert_eq!(under.config.gripper, 0.0);
        assert!(under.limited.gripper);
    }
}
