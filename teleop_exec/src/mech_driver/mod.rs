//! Mechanisms driver module
//!
//! Boundary between the control loop and the arm actuators. The control loop
//! talks to a [`MechDriver`] implementation: telemetry reads and demand
//! sends, both bounded well within one control tick. Any driver error is
//! fatal to the session, blind retries of motion commands after a driver
//! fault are unsafe.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod sim;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::Params;
pub use sim::SimMechDriver;

use eqpt_if::eqpt::arm::{ArmDems, ArmDemsResponse, ArmSensData};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors raised by an arm driver.
#[derive(Debug, thiserror::Error)]
pub enum MechDriverError {
    #[error("Failed to read joint telemetry: {0}")]
    SensReadError(String),

    #[error("Failed to send joint demands: {0}")]
    DemsSendError(String),
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// The actuator driver boundary.
pub trait MechDriver {
    /// Read the current joint telemetry.
    ///
    /// Implementations must return within one control tick period.
    fn read_sens(&mut self) -> Result<ArmSensData, MechDriverError>;

    /// Send a joint demand set, best-effort acknowledgement.
    fn send_dems(&mut self, dems: &ArmDems) -> Result<ArmDemsResponse, MechDriverError>;

    /// Best-effort command to stop all motion and hold position, used on
    /// shutdown and after faults.
    fn safe_stop(&mut self) -> Result<(), MechDriverError>;
}
