//! Teleop control module
//!
//! The per-tick semantics of the fixed-rate control loop: the run-time state
//! machine (INITIALISING, TRACKING, HOLDING, SHUTTING DOWN), inverse
//! kinematics invocation, per-tick joint rate limiting and actuator demand
//! assembly. Wall-clock scheduling and overrun accounting live in the
//! executable's main loop, this module is driven once per tick.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::Params;
pub use state::*;

use crate::arm_kin::ArmKinError;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during TeleopCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum TeleopCtrlError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Could not build the kinematic model: {0}")]
    KinModelError(ArmKinError),

    #[error("Control parameter {0} must be positive, found {1}")]
    InvalidParam(&'static str, f64),
}
