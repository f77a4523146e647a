//! # Arm Equipment Commands
//!
//! Demand and telemetry types exchanged with the arm actuator driver.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// All joints of the arm, in kinematic chain order.
pub const ARM_JOINT_IDS: [ArmJoint; 6] = [
    ArmJoint::Lift,
    ArmJoint::ArmExtend,
    ArmJoint::WristYaw,
    ArmJoint::WristPitch,
    ArmJoint::WristRoll,
    ArmJoint::Gripper,
];

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// IDs of all actuated joints on the arm.
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
pub enum ArmJoint {
    /// Vertical lift, prismatic.
    Lift,
    /// Telescoping arm extension, prismatic.
    ArmExtend,
    /// Wrist yaw, revolute about the vertical axis.
    WristYaw,
    /// Wrist pitch, revolute.
    WristPitch,
    /// Wrist roll, revolute about the tool axis.
    WristRoll,
    /// Gripper aperture, normalised.
    Gripper,
}

/// Response from the arm driver based on the demands sent by the control loop.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq)]
pub enum ArmDemsResponse {
    /// Demands were valid and will be executed
    DemsOk,

    /// Demands were invalid and have been rejected
    DemsInvalid,

    /// Equipment is invalid so demands cannot be actuated
    EqptInvalid,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Demands that are sent from the control loop to the arm driver.
///
/// Positions are metres for prismatic joints, radians for revolute joints and
/// a normalised \[0, 1\] aperture for the gripper.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ArmDems {
    /// The demanded position of each joint.
    pub pos: HashMap<ArmJoint, f64>,

    /// The maximum speed each joint may move at while acquiring its demanded
    /// position. Metres/second or radians/second to match the joint.
    pub max_speed: HashMap<ArmJoint, f64>,
}

/// Joint telemetry returned by the arm driver to the control loop.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ArmSensData {
    /// The measured position of each joint, same units as [`ArmDems::pos`].
    pub pos: HashMap<ArmJoint, f64>,

    /// The measured velocity of each joint.
    pub speed: HashMap<ArmJoint, f64>,

    /// Time at which the telemetry was sampled.
    pub timestamp: DateTime<Utc>,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl ArmJoint {
    /// True for joints whose position is a length rather than an angle.
    pub fn is_prismatic(&self) -> bool {
        matches!(self, ArmJoint::Lift | ArmJoint::ArmExtend)
    }
}

impl Default for ArmDems {
    fn default() -> Self {
        let mut pos = HashMap::new();
        let mut max_speed = HashMap::new();

        for id in ARM_JOINT_IDS.iter() {
            pos.insert(*id, 0.0);
            max_speed.insert(*id, 0.0);
        }

        Self { pos, max_speed }
    }
}

impl Default for ArmSensData {
    fn default() -> Self {
        let mut pos = HashMap::new();
        let mut speed = HashMap::new();

        for id in ARM_JOINT_IDS.iter() {
            pos.insert(*id, 0.0);
            speed.insert(*id, 0.0);
        }

        Self {
            pos,
            speed,
            timestamp: Utc::now(),
        }
    }
}
