//! Parameters structure for the simulated arm driver

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the simulated arm.
#[derive(Debug, Default, Deserialize)]
pub struct Params {
    /// First-order time constant with which each simulated joint approaches
    /// its demanded position.
    ///
    /// Units: seconds
    pub joint_time_const_s: f64,

    // ---- INITIAL CONFIGURATION ----

    /// Initial lift position.
    ///
    /// Units: meters
    pub initial_lift_m: f64,

    /// Initial arm extension.
    ///
    /// Units: meters
    pub initial_arm_ext_m: f64,

    /// Initial wrist joint positions.
    ///
    /// Units: radians
    pub initial_wrist_yaw_rad: f64,
    pub initial_wrist_pitch_rad: f64,
    pub initial_wrist_roll_rad: f64,

    /// Initial normalised gripper aperture.
    pub initial_gripper: f64,
}
