//! # Equipment Interface Library
//!
//! Defines the boundary types exchanged between the teleop executable and
//! its equipment collaborators: the arm actuator driver and the marker
//! camera. The collaborators themselves live outside the core software,
//! only their data contracts are specified here.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod eqpt;
