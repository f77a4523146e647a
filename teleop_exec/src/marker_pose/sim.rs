//! Simulated marker camera
//!
//! Stands in for the webcam and detector when running without hardware.
//! Generates a deterministic tong motion: the grip centre orbits slowly, the
//! inter-tong axis spins about the vertical, and the tong separation
//! oscillates between its closed and open distances.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::Utc;
use nalgebra::{Point3, UnitQuaternion, Vector3};
use std::f64::consts::TAU;

// Internal
use super::{MarkerCamera, MarkerCameraError, Params};
use eqpt_if::eqpt::vision::{MarkerDetection, MarkerFrame};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A camera implementation generating synthetic tong detections.
pub struct SimMarkerCamera {
    left_id: u32,
    right_id: u32,
    sim: super::params::SimCamParams,

    /// Simulated elapsed time, advanced one frame interval per frame.
    t_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimMarkerCamera {
    /// Build the sim camera from the extractor's parameters, so the
    /// generated IDs always match the configured role assignment.
    pub fn from_params(params: &Params) -> Self {
        Self {
            left_id: params.left_marker_id,
            right_id: params.right_marker_id,
            sim: params.sim.clone(),
            t_s: 0.0,
        }
    }

    fn detection(&self, id: u32, pos: Point3<f64>) -> MarkerDetection {
        MarkerDetection {
            id,
            pos_m_cam: pos,
            // Both markers face the camera squarely in the sim
            rot_cam: UnitQuaternion::identity(),
            confidence: 1.0,
        }
    }
}

impl MarkerCamera for SimMarkerCamera {
    fn next_frame(&mut self) -> Result<Option<MarkerFrame>, MarkerCameraError> {
        let s = &self.sim;
        self.t_s += s.frame_dt_s;
        let t = self.t_s;

        // Grip centre on a slow horizontal orbit
        let orbit_phase = TAU * t / s.orbit_period_s;
        let centre = Point3::new(
            s.centre_m_cam[0] + s.orbit_radius_m * orbit_phase.cos(),
            s.centre_m_cam[1] + s.orbit_radius_m * orbit_phase.sin(),
            s.centre_m_cam[2],
        );

        // Inter-tong axis spinning about the vertical
        let spin_phase = TAU * t / s.spin_period_s;
        let axis = Vector3::new(spin_phase.cos(), spin_phase.sin(), 0.0);

        // Tong separation oscillating between closed and open
        let aperture_phase = TAU * t / s.aperture_period_s;
        let half_dist = 0.25
            * ((s.grip_max_dist_m - s.grip_min_dist_m) * (1.0 - aperture_phase.cos())
                + 2.0 * s.grip_min_dist_m);

        let mut frame = MarkerFrame::empty(Utc::now());
        frame.markers.insert(
            self.left_id,
            self.detection(self.left_id, centre - axis * half_dist),
        );
        frame.markers.insert(
            self.right_id,
            self.detection(self.right_id, centre + axis * half_dist),
        );

        Ok(Some(frame))
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sim_separation_stays_in_range() {
        let params = Params {
            left_marker_id: 3,
            right_marker_id: 7,
            min_confidence: 0.5,
            stale_frame_limit_s: 0.2,
            poll_period_s: 0.01,
            sim: Default::default(),
        };
        let mut camera = SimMarkerCamera::from_params(&params);

        for _ in 0..1000 {
            let frame = camera.next_frame().unwrap().unwrap();

            let left = &frame.markers[&3];
            let right = &frame.markers[&7];
            let dist = (right.pos_m_cam - left.pos_m_cam).norm();

            assert!(dist >= camera.sim.grip_min_dist_m - 1e-9);
            assert!(dist <= camera.sim.grip_max_dist_m + 1e-9);
        }
    }
}
