//! Parameters structure for the marker pose extractor

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for marker pose extraction.
#[derive(Debug, Default, Deserialize)]
pub struct Params {
    // ---- ROLE ASSIGNMENT ----

    /// Fiducial ID of the marker mounted on the left tong.
    pub left_marker_id: u32,

    /// Fiducial ID of the marker mounted on the right tong.
    pub right_marker_id: u32,

    // ---- FILTERING ----

    /// Detections below this confidence are treated as absent.
    pub min_confidence: f64,

    /// A frame older than this is treated as if both markers were absent.
    ///
    /// Units: seconds
    pub stale_frame_limit_s: f64,

    // ---- ACQUISITION ----

    /// Period at which the acquisition thread polls the camera.
    ///
    /// Units: seconds
    pub poll_period_s: f64,

    /// Simulated camera setup, only used when the sim camera is selected.
    #[serde(default)]
    pub sim: SimCamParams,
}

/// Parameters describing the simulated tong motion.
#[derive(Debug, Clone, Deserialize)]
pub struct SimCamParams {
    /// Centre of the simulated grip motion.
    ///
    /// Units: meters,
    /// Frame: Camera
    pub centre_m_cam: [f64; 3],

    /// Radius of the slow orbit the grip centre follows.
    ///
    /// Units: meters
    pub orbit_radius_m: f64,

    /// Period of one full orbit.
    ///
    /// Units: seconds
    pub orbit_period_s: f64,

    /// Period of one full rotation of the inter-tong axis.
    ///
    /// Units: seconds
    pub spin_period_s: f64,

    /// Minimum and maximum simulated inter-tong distances.
    ///
    /// Units: meters
    pub grip_min_dist_m: f64,
    pub grip_max_dist_m: f64,

    /// Period of the open/close oscillation.
    ///
    /// Units: seconds
    pub aperture_period_s: f64,

    /// Simulated camera frame interval.
    ///
    /// Units: seconds
    pub frame_dt_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SimCamParams {
    fn default() -> Self {
        Self {
            centre_m_cam: [0.45, 0.0, 0.55],
            orbit_radius_m: 0.08,
            orbit_period_s: 12.0,
            spin_period_s: 19.0,
            grip_min_dist_m: 0.03,
            grip_max_dist_m: 0.12,
            aperture_period_s: 7.0,
            frame_dt_s: 1.0 / 30.0,
        }
    }
}
