//! Marker pose extractor module
//!
//! Thin glue between the vision primitive and the goal generator: takes the
//! raw per-frame marker detections, drops low-confidence ones, assigns
//! markers to their tong roles and publishes the result through the
//! latest-value slot. Runs on the acquisition thread so the control loop
//! never waits on the camera.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
pub mod sim;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::{DateTime, Utc};
use log::{info, warn};
use nalgebra::{Point3, UnitQuaternion};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Internal
pub use params::{Params, SimCamParams};

use eqpt_if::eqpt::vision::MarkerFrame;
use util::latest::LatestWriter;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The two tong roles of the hand-held controller.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TongRole {
    LeftTong,
    RightTong,
}

/// Possible errors that can occur while setting up the extractor.
#[derive(Debug, thiserror::Error)]
pub enum MarkerPoseError {
    #[error("Left and right tong roles are both assigned to marker {0}")]
    DuplicateRoleIds(u32),

    #[error("Minimum confidence must be in [0, 1], found {0}")]
    InvalidMinConfidence(f64),

    #[error("Period {0} must be a positive number of seconds, found {1}")]
    InvalidPeriod(&'static str, f64),
}

/// Possible errors reported by the vision primitive.
#[derive(Debug, thiserror::Error)]
pub enum MarkerCameraError {
    #[error("Camera device error: {0}")]
    DeviceError(String),
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single role-assigned marker observation.
#[derive(Debug, Clone)]
pub struct MarkerObservation {
    /// The marker's fiducial ID.
    pub id: u32,

    /// Which tong this marker is mounted on.
    pub role: TongRole,

    /// Position of the marker centre.
    ///
    /// Units: meters,
    /// Frame: Camera
    pub pos_m_cam: Point3<f64>,

    /// Orientation of the marker.
    ///
    /// Frame: Camera
    pub rot_cam: UnitQuaternion<f64>,

    /// Detection confidence in \[0, 1\].
    pub confidence: f64,

    /// Camera timestamp of the source frame.
    pub timestamp: DateTime<Utc>,
}

/// The tong observations extracted from one camera frame.
///
/// A tong that was not seen in the frame is `None`.
#[derive(Debug, Clone, Default)]
pub struct TongObservations {
    pub left: Option<MarkerObservation>,
    pub right: Option<MarkerObservation>,

    /// Camera timestamp of the source frame, `None` before the first frame.
    pub timestamp: Option<DateTime<Utc>>,
}

/// Extracts role-assigned tong observations from raw marker frames.
pub struct MarkerPoseExtractor {
    params: Params,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// The vision primitive boundary.
///
/// Implementations deliver at most one detection per marker per frame, and
/// return `Ok(None)` when no new frame has been processed since the last
/// call.
pub trait MarkerCamera: Send {
    fn next_frame(&mut self) -> Result<Option<MarkerFrame>, MarkerCameraError>;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MarkerPoseExtractor {
    /// Build the extractor, validating the role assignment.
    pub fn new(params: Params) -> Result<Self, MarkerPoseError> {
        if params.left_marker_id == params.right_marker_id {
            return Err(MarkerPoseError::DuplicateRoleIds(params.left_marker_id));
        }
        if params.min_confidence < 0.0 || params.min_confidence > 1.0 {
            return Err(MarkerPoseError::InvalidMinConfidence(params.min_confidence));
        }
        if params.poll_period_s <= 0.0 {
            return Err(MarkerPoseError::InvalidPeriod(
                "poll_period_s",
                params.poll_period_s,
            ));
        }
        if params.stale_frame_limit_s <= 0.0 {
            return Err(MarkerPoseError::InvalidPeriod(
                "stale_frame_limit_s",
                params.stale_frame_limit_s,
            ));
        }

        Ok(Self { params })
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Fold one camera frame into role-assigned tong observations.
    ///
    /// Detections below the confidence floor are treated as absent.
    pub fn extract(&self, frame: &MarkerFrame) -> TongObservations {
        let mut obs = TongObservations {
            timestamp: Some(frame.timestamp),
            ..TongObservations::default()
        };

        for (id, detection) in frame.markers.iter() {
            let role = if *id == self.params.left_marker_id {
                TongRole::LeftTong
            } else if *id == self.params.right_marker_id {
                TongRole::RightTong
            } else {
                // Not a tong marker, ignore
                continue;
            };

            if detection.confidence < self.params.min_confidence {
                continue;
            }

            let observation = MarkerObservation {
                id: *id,
                role,
                pos_m_cam: detection.pos_m_cam,
                rot_cam: detection.rot_cam,
                confidence: detection.confidence,
                timestamp: frame.timestamp,
            };

            match role {
                TongRole::LeftTong => obs.left = Some(observation),
                TongRole::RightTong => obs.right = Some(observation),
            }
        }

        obs
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Acquisition thread main function.
///
/// Polls the camera at the configured period, extracts tong observations and
/// publishes them into the latest-value slot until the stop flag is raised.
/// Camera errors are logged on entry into the failed condition and treated
/// as missing frames, the control loop sees them as tracking loss.
pub fn acquisition_main(
    mut camera: Box<dyn MarkerCamera>,
    extractor: MarkerPoseExtractor,
    writer: LatestWriter<TongObservations>,
    stop: Arc<AtomicBool>,
) {
    info!("Marker acquisition thread started");

    let poll_period = Duration::from_secs_f64(extractor.params.poll_period_s);
    let mut camera_failed = false;

    while !stop.load(Ordering::Relaxed) {
        match camera.next_frame() {
            Ok(Some(frame)) => {
                if camera_failed {
                    info!("Camera recovered");
                    camera_failed = false;
                }

                writer.publish(extractor.extract(&frame));
            }
            Ok(None) => (),
            Err(e) => {
                if !camera_failed {
                    warn!("Camera error, markers unavailable: {}", e);
                    camera_failed = true;
                }
            }
        }

        std::thread::sleep(poll_period);
    }

    info!("Marker acquisition thread stopped");
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use eqpt_if::eqpt::vision::MarkerDetection;

    fn test_extractor() -> MarkerPoseExtractor {
        MarkerPoseExtractor::new(Params {
            left_marker_id: 3,
            right_marker_id: 7,
            min_confidence: 0.5,
            stale_frame_limit_s: 0.2,
            poll_period_s: 0.01,
            sim: Default::default(),
        })
        .unwrap()
    }

    fn detection(id: u32, confidence: f64) -> MarkerDetection {
        MarkerDetection {
            id,
            pos_m_cam: Point3::new(0.1, 0.2, 0.5),
            rot_cam: UnitQuaternion::identity(),
            confidence,
        }
    }

    #[test]
    fn test_role_assignment() {
        let extractor = test_extractor();

        let mut frame = MarkerFrame::empty(Utc::now());
        frame.markers.insert(3, detection(3, 0.9));
        frame.markers.insert(7, detection(7, 0.9));
        frame.markers.insert(12, detection(12, 0.9));

        let obs = extractor.extract(&frame);

        assert_eq!(obs.left.as_ref().map(|o| o.id), Some(3));
        assert_eq!(obs.right.as_ref().map(|o| o.id), Some(7));
    }

    #[test]
    fn test_low_confidence_dropped() {
        let extractor = test_extractor();

        let mut frame = MarkerFrame::empty(Utc::now());
        frame.markers.insert(3, detection(3, 0.2));
        frame.markers.insert(7, detection(7, 0.9));

        let obs = extractor.extract(&frame);

        assert!(obs.left.is_none());
        assert!(obs.right.is_some());
    }

    #[test]
    fn test_absent_marker_is_none() {
        let extractor = test_extractor();

        let frame = MarkerFrame::empty(Utc::now());
        let obs = extractor.extract(&frame);

        assert!(obs.left.is_none());
        assert!(obs.right.is_none());
        assert!(obs.timestamp.is_some());
    }

    #[test]
    fn test_duplicate_role_ids_rejected() {
        let result = MarkerPoseExtractor::new(Params {
            left_marker_id: 5,
            right_marker_id: 5,
            min_confidence: 0.5,
            stale_frame_limit_s: 0.2,
            poll_period_s: 0.01,
            sim: Default::default(),
        });

        assert!(matches!(result, Err(MarkerPoseError::DuplicateRoleIds(5))));
    }
}
