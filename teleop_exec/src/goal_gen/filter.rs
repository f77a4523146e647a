//! Goal smoothing filters
//!
//! Exponential filtering applied independently to position, orientation and
//! aperture. Orientation is filtered by slerping toward the target so the
//! output can never jump across a representation discontinuity. Filter state
//! persists across ticks, including through a tracking loss, which is what
//! makes a reacquired goal converge smoothly instead of snapping.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Point3, UnitQuaternion};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Persistent smoothing state for the goal outputs.
#[derive(Default)]
pub(crate) struct GoalFilter {
    pos: Option<Point3<f64>>,
    rot: Option<UnitQuaternion<f64>>,
    aperture: Option<f64>,
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Smoothing gain for one step of length `dt_s` with time constant `tau_s`.
///
/// A zero time constant disables filtering (gain of one).
fn gain(dt_s: f64, tau_s: f64) -> f64 {
    if tau_s <= 0.0 {
        1.0
    } else {
        dt_s / (tau_s + dt_s)
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GoalFilter {
    /// Advance the pose filters toward a target, returning the filtered pose.
    ///
    /// The first target after construction initialises the filter state
    /// directly.
    pub fn advance_pose(
        &mut self,
        target_pos: Point3<f64>,
        target_rot: UnitQuaternion<f64>,
        dt_s: f64,
        pos_tau_s: f64,
        rot_tau_s: f64,
    ) -> (Point3<f64>, UnitQuaternion<f64>) {
        let pos = match self.pos {
            Some(p) => p + (target_pos - p) * gain(dt_s, pos_tau_s),
            None => target_pos,
        };

        let rot = match self.rot {
            // try_slerp fails only for exactly antipodal orientations, where
            // the shortest path is undefined, take the target outright
            Some(r) => r
                .try_slerp(&target_rot, gain(dt_s, rot_tau_s), 1e-9)
                .unwrap_or(target_rot),
            None => target_rot,
        };

        self.pos = Some(pos);
        self.rot = Some(rot);

        (pos, rot)
    }

    /// Advance the aperture filter toward a target, returning the filtered
    /// aperture.
    pub fn advance_aperture(&mut self, target: f64, dt_s: f64, tau_s: f64) -> f64 {
        let aperture = match self.aperture {
            Some(a) => a + (target - a) * gain(dt_s, tau_s),
            None => target,
        };

        self.aperture = Some(aperture);

        aperture
    }

    /// The current filtered aperture, if any target has been seen.
    pub fn aperture(&self) -> Option<f64> {
        self.aperture
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_first_target_initialises() {
        let mut filter = GoalFilter::default();

        let (pos, rot) = filter.advance_pose(
            Point3::new(1.0, 2.0, 3.0),
            UnitQuaternion::identity(),
            0.03,
            0.1,
            0.1,
        );

        assert_eq!(pos, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(rot, UnitQuaternion::identity());
    }

    #[test]
    fn test_position_converges_monotonically() {
        let mut filter = GoalFilter::default();

        filter.advance_pose(
            Point3::origin(),
            UnitQuaternion::identity(),
            0.03,
            0.1,
            0.1,
        );

        let target = Point3::new(1.0, 0.0, 0.0);
        let mut last_x = 0.0;

        for _ in 0..100 {
            let (pos, _) =
                filter.advance_pose(target, UnitQuaternion::identity(), 0.03, 0.1, 0.1);

            assert!(pos.x > last_x);
            assert!(pos.x <= 1.0);
            last_x = pos.x;
        }

        assert!((last_x - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_zero_tau_passes_through() {
        let mut filter = GoalFilter::default();

        filter.advance_aperture(0.0, 0.03, 0.0);
        let a = filter.advance_aperture(0.7, 0.03, 0.0);

        assert_eq!(a, 0.7);
    }

    #[test]
    fn test_aperture_frozen_when_not_advanced() {
        let mut filter = GoalFilter::default();

        filter.advance_aperture(0.4, 0.03, 0.05);

        // Degraded mode reads the held value without advancing
        assert_eq!(filter.aperture(), Some(0.4));
    }
}
