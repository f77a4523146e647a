//! Goal generator module
//!
//! Fuses the tong marker observations into a single teleoperation goal: a
//! wrist pose in the robot base frame plus a normalised gripper aperture.
//! Owns the temporal smoothing filters and the loss-of-track detection that
//! drives the control loop's HOLDING behaviour.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod filter;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during GoalGen operation.
#[derive(Debug, thiserror::Error)]
pub enum GoalGenError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error(
        "Closed grip reference distance ({closed} m) must be positive and \
         below the open distance ({open} m)"
    )]
    InvalidGripDistances { closed: f64, open: f64 },

    #[error("Camera-to-base calibration transform is not finite or not normalisable")]
    InvalidCalibTransform,

    #[error("Filter time constant {0} must be non-negative, found {1}")]
    InvalidTimeConstant(&'static str, f64),

    #[error("Loss tick limit must be at least 1")]
    InvalidLossTickLimit,
}
