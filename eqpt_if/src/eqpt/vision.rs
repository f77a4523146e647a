//! # Marker Camera Equipment Data
//!
//! Per-frame fiducial marker detections as produced by the vision primitive.
//! The primitive supplies at most one detection per marker per frame; a
//! marker that was not seen has no entry at all, never a zero pose.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use nalgebra::{Point3, UnitQuaternion};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single marker detection in one camera frame.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MarkerDetection {
    /// The marker's fiducial ID.
    pub id: u32,

    /// Position of the marker centre.
    ///
    /// Units: meters,
    /// Frame: Camera
    pub pos_m_cam: Point3<f64>,

    /// Orientation of the marker.
    ///
    /// Frame: Camera
    pub rot_cam: UnitQuaternion<f64>,

    /// Detection confidence in \[0, 1\], as reported by the vision primitive.
    pub confidence: f64,
}

/// All marker detections from one processed camera frame.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MarkerFrame {
    /// Camera timestamp of the frame the detections came from.
    pub timestamp: DateTime<Utc>,

    /// Detections keyed by marker ID.
    pub markers: HashMap<u32, MarkerDetection>,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl MarkerFrame {
    /// Create an empty frame stamped with the given time.
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            markers: HashMap::new(),
        }
    }

    /// Age of this frame relative to `now`, in seconds. Negative ages (clock
    /// skew between camera and host) are reported as zero.
    pub fn age_s(&self, now: DateTime<Utc>) -> f64 {
        let age = now
            .signed_duration_since(self.timestamp)
            .num_milliseconds() as f64
            * 0.001;

        age.max(0.0)
    }
}
