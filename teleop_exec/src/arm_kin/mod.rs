//! # Arm kinematics module
//!
//! Closed-form forward and inverse kinematics for the arm's joint chain: a
//! vertical prismatic lift, a horizontal telescoping extension, and a
//! yaw/pitch/roll wrist. The chain has two positional degrees of freedom
//! (lift and extension), the horizontal direction of a target is absorbed by
//! the wrist yaw.
//!
//! The solver is pure per call. Continuity between control ticks (the
//! yaw/roll split inside the gimbal-lock region, and angle unwrapping) is
//! threaded through an explicit seed configuration owned by the caller.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod calc_fwd;
mod calc_inv;
mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Isometry3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// Internal
pub use params::Params;

#[cfg(test)]
pub(crate) use params::test_params;

use eqpt_if::eqpt::arm::{ArmDems, ArmJoint, ArmSensData};

// ---------------------------------------------------------------------------
// TYPES
// ---------------------------------------------------------------------------

/// A pose of the grip centre: Cartesian position and rotation.
///
/// Frame: robot base
pub type Pose = Isometry3<f64>;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur while building the kinematic model.
#[derive(Debug, thiserror::Error)]
pub enum ArmKinError {
    #[error("Limits for {joint} are invalid: min ({min}) must be below max ({max})")]
    InvalidLimits {
        joint: &'static str,
        min: f64,
        max: f64,
    },

    #[error("Kinematic parameter {0} is not finite")]
    NonFiniteParam(&'static str),

    #[error("Singularity threshold must be in (0, 1), found {0}")]
    InvalidSingularityLimit(f64),
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A full set of joint values for the arm.
///
/// Prismatic joints are in metres, wrist joints in radians, the gripper is a
/// normalised \[0, 1\] aperture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ArmConfig {
    pub lift_m: f64,
    pub arm_ext_m: f64,
    pub wrist_yaw_rad: f64,
    pub wrist_pitch_rad: f64,
    pub wrist_roll_rad: f64,
    pub gripper: f64,
}

/// Per-joint flags raised when a solved value had to be clamped to its limit.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct JointFlags {
    pub lift: bool,
    pub arm_ext: bool,
    pub wrist_yaw: bool,
    pub wrist_pitch: bool,
    pub wrist_roll: bool,
    pub gripper: bool,
}

/// A solved joint target.
///
/// The target always carries in-limit joint values. `reachable` is false iff
/// at least one value required clamping, in which case the clamped joints are
/// identified by `limited`.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct JointTarget {
    /// The solved joint values, clamped to the model's limits.
    pub config: ArmConfig,

    /// Which joints were clamped.
    pub limited: JointFlags,

    /// False iff any joint value required clamping.
    pub reachable: bool,

    /// True if the target orientation was inside the wrist's gimbal-lock
    /// region and the seed's yaw/roll split was held.
    pub singular: bool,
}

/// The arm's kinematic model.
///
/// Built once at startup from a validated parameter set, immutable for the
/// lifetime of the session.
pub struct ArmKin {
    pub(crate) params: Params,

    /// Effective lift zero height, resolved from the base-height mode.
    pub(crate) base_height_m: f64,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Forward and inverse kinematics of the arm.
pub trait Kinematics {
    /// Compute the grip-centre pose for a set of joint values.
    fn forward(&self, config: &ArmConfig) -> Pose;

    /// Solve a target grip-centre pose and gripper aperture into a joint
    /// target.
    ///
    /// `seed` provides the previous solution for angle continuity; out of
    /// range targets are clamped and flagged, never rejected.
    fn inverse(&self, target: &Pose, aperture: f64, seed: &ArmConfig) -> JointTarget;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ArmKin {
    /// Build the kinematic model from a parameter set.
    ///
    /// Fails if the parameters are malformed, no motion may be commanded
    /// against an unvalidated model.
    pub fn new(params: Params) -> Result<Self, ArmKinError> {
        params.validate()?;

        let base_height_m = if params.ground_mode {
            params.lift_base_height_ground_m
        } else {
            params.lift_base_height_m
        };

        Ok(Self {
            params,
            base_height_m,
        })
    }
}

impl Kinematics for ArmKin {
    fn forward(&self, config: &ArmConfig) -> Pose {
        self.calc_forward(config)
    }

    fn inverse(&self, target: &Pose, aperture: f64, seed: &ArmConfig) -> JointTarget {
        self.calc_inverse(target, aperture, seed)
    }
}

impl ArmConfig {
    /// Get the value of a single joint.
    pub fn value(&self, joint: ArmJoint) -> f64 {
        match joint {
            ArmJoint::Lift => self.lift_m,
            ArmJoint::ArmExtend => self.arm_ext_m,
            ArmJoint::WristYaw => self.wrist_yaw_rad,
            ArmJoint::WristPitch => self.wrist_pitch_rad,
            ArmJoint::WristRoll => self.wrist_roll_rad,
            ArmJoint::Gripper => self.gripper,
        }
    }

    /// Set the value of a single joint.
    pub fn set_value(&mut self, joint: ArmJoint, value: f64) {
        match joint {
            ArmJoint::Lift => self.lift_m = value,
            ArmJoint::ArmExtend => self.arm_ext_m = value,
            ArmJoint::WristYaw => self.wrist_yaw_rad = value,
            ArmJoint::WristPitch => self.wrist_pitch_rad = value,
            ArmJoint::WristRoll => self.wrist_roll_rad = value,
            ArmJoint::Gripper => self.gripper = value,
        }
    }

    /// Build a configuration from measured joint telemetry.
    ///
    /// Joints missing from the telemetry read as zero.
    pub fn from_sens(sens: &ArmSensData) -> Self {
        let mut config = Self::default();

        for (joint, pos) in sens.pos.iter() {
            config.set_value(*joint, *pos);
        }

        config
    }

    /// Build a demand set commanding this configuration with the given
    /// per-joint speed limits.
    pub fn to_dems(&self, max_speed: &HashMap<ArmJoint, f64>) -> ArmDems {
        let mut dems = ArmDems::default();

        for (joint, speed) in max_speed.iter() {
            dems.pos.insert(*joint, self.value(*joint));
            dems.max_speed.insert(*joint, *speed);
        }

        dems
    }
}

impl JointFlags {
    /// Raise the flag for a single joint.
    pub fn set(&mut self, joint: ArmJoint) {
        match joint {
            ArmJoint::Lift => self.lift = true,
            ArmJoint::ArmExtend => self.arm_ext = true,
            ArmJoint::WristYaw => self.wrist_yaw = true,
            ArmJoint::WristPitch => self.wrist_pitch = true,
            ArmJoint::WristRoll => self.wrist_roll = true,
            ArmJoint::Gripper => self.gripper = true,
        }
    }

    /// True if any joint was clamped.
    pub fn any(&self) -> bool {
        self.lift
            || self.arm_ext
            || self.wrist_yaw
            || self.wrist_pitch
            || self.wrist_roll
            || self.gripper
    }
}
