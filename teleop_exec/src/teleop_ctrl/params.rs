//! Parameters structure for the teleop control module

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::TeleopCtrlError;
use eqpt_if::eqpt::arm::ArmJoint;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for teleop control.
#[derive(Debug, Default, Deserialize)]
pub struct Params {
    // ---- TIMING ----

    /// Target period of one control cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    // ---- RATE LIMITS ----

    /// Maximum commanded joint speeds. The per-tick command delta is bounded
    /// by these independently of the solver's own clamping.
    ///
    /// Units: meters/second
    pub lift_max_vel_ms: f64,
    pub arm_ext_max_vel_ms: f64,

    /// Units: radians/second
    pub wrist_yaw_max_vel_rads: f64,
    pub wrist_pitch_max_vel_rads: f64,
    pub wrist_roll_max_vel_rads: f64,

    /// Units: 1/second (normalised aperture per second)
    pub gripper_max_vel: f64,

    // ---- OPERATING MODES ----

    /// If true all speed limits are scaled down by `reduced_speed_scale`.
    pub reduced_speed: bool,

    /// Speed scale applied in reduced-speed mode, in (0, 1].
    pub reduced_speed_scale: f64,

    /// If true an unreachable (clamped) target suppresses motion and the
    /// last commanded target is held instead.
    pub suppress_unreachable: bool,

    /// Minimum interval between unreachable-target log messages.
    ///
    /// Units: seconds
    pub unreachable_log_backoff_s: f64,

    // ---- STARTING CONFIGURATION ----

    /// Joint configuration commanded once during initialisation.
    pub start_lift_m: f64,
    pub start_arm_ext_m: f64,
    pub start_wrist_yaw_rad: f64,
    pub start_wrist_pitch_rad: f64,
    pub start_wrist_roll_rad: f64,
    pub start_gripper: f64,

    /// Speed scale used while moving to the starting configuration.
    pub start_speed_scale: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check the parameter set is usable.
    pub fn validate(&self) -> Result<(), TeleopCtrlError> {
        let positives: [(&'static str, f64); 10] = [
            ("cycle_period_s", self.cycle_period_s),
            ("lift_max_vel_ms", self.lift_max_vel_ms),
            ("arm_ext_max_vel_ms", self.arm_ext_max_vel_ms),
            ("wrist_yaw_max_vel_rads", self.wrist_yaw_max_vel_rads),
            ("wrist_pitch_max_vel_rads", self.wrist_pitch_max_vel_rads),
            ("wrist_roll_max_vel_rads", self.wrist_roll_max_vel_rads),
            ("gripper_max_vel", self.gripper_max_vel),
            ("reduced_speed_scale", self.reduced_speed_scale),
            ("unreachable_log_backoff_s", self.unreachable_log_backoff_s),
            ("start_speed_scale", self.start_speed_scale),
        ];

        for (name, value) in positives.iter() {
            if !value.is_finite() || *value <= 0.0 {
                return Err(TeleopCtrlError::InvalidParam(name, *value));
            }
        }

        Ok(())
    }

    /// The speed limit of a single joint, before any mode scaling.
    pub fn max_vel(&self, joint: ArmJoint) -> f64 {
        match joint {
            ArmJoint::Lift => self.lift_max_vel_ms,
            ArmJoint::ArmExtend => self.arm_ext_max_vel_ms,
            ArmJoint::WristYaw => self.wrist_yaw_max_vel_rads,
            ArmJoint::WristPitch => self.wrist_pitch_max_vel_rads,
            ArmJoint::WristRoll => self.wrist_roll_max_vel_rads,
            ArmJoint::Gripper => self.gripper_max_vel,
        }
    }
}
