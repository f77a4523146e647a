//! Implementations for the GoalGen state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::{DateTime, Utc};
use log::{info, warn};
use nalgebra::{Isometry3, Matrix3, Point3, Rotation3, UnitQuaternion, Vector3};
use serde::Serialize;

// Internal
use super::filter::GoalFilter;
use super::{GoalGenError, Params};
use crate::marker_pose::{MarkerObservation, TongObservations, TongRole};
use util::{
    archive::{Archived, Archiver},
    maths::{clamp, lin_map},
    module::State,
    params,
    session::{get_elapsed_seconds, Session},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Goal generator module state
pub struct GoalGen {
    params: Params,

    /// Camera-to-base transform, resolved from calibration at init.
    cam_to_base: Isometry3<f64>,

    report: StatusReport,

    /// Persistent smoothing state.
    filter: GoalFilter,

    /// The last goal produced, held during tracking loss.
    last_goal: Option<TeleopGoal>,

    /// Last known unit vector from left tong to right tong.
    ///
    /// Frame: robot base
    grip_axis_rb: Option<Vector3<f64>>,

    /// Last orientation fused from both tongs, held in degraded mode.
    two_tong_rot_rb: Option<UnitQuaternion<f64>>,

    /// Consecutive ticks in which neither tong was observed.
    ticks_without_markers: u32,

    /// True once the loss tick limit has been crossed.
    tracking_lost: bool,

    arch_goal: Archiver,
    arch_report: Archiver,
}

/// Input data to goal generation.
#[derive(Default)]
pub struct InputData {
    /// The most recent tong observations from the acquisition thread.
    pub obs: TongObservations,

    /// True if the observations are older than the staleness limit, in which
    /// case they are treated as if no marker was seen this tick.
    pub frame_stale: bool,

    /// Elapsed time since the previous tick.
    ///
    /// Units: seconds
    pub dt_s: f64,
}

/// The teleoperation goal produced every tick.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct TeleopGoal {
    /// Target grip-centre position.
    ///
    /// Units: meters,
    /// Frame: robot base
    pub pos_m_rb: Point3<f64>,

    /// Target grip orientation.
    ///
    /// Frame: robot base
    pub rot_rb: UnitQuaternion<f64>,

    /// Normalised gripper aperture, 0 closed to 1 open.
    pub aperture: f64,

    /// False while tracking has been lost beyond the tick limit.
    pub valid: bool,

    /// Camera timestamp of the observations this goal was fused from.
    pub timestamp: DateTime<Utc>,
}

/// Status report for GoalGen processing.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct StatusReport {
    /// Number of tong markers used this tick (0, 1 or 2).
    pub markers_visible: u8,

    /// True when running on a single tong.
    pub degraded: bool,

    /// Consecutive ticks without any tong marker.
    pub ticks_without_markers: u32,

    /// Pre-filter aperture computed from the inter-marker distance.
    pub aperture_raw: f64,

    /// True once the loss tick limit has been crossed.
    pub tracking_lost: bool,
}

/// A fused, pre-filter target for one tick.
struct FusedTarget {
    pos_m_rb: Point3<f64>,
    rot_rb: UnitQuaternion<f64>,

    /// `None` in degraded mode, where the aperture is frozen.
    aperture: Option<f64>,

    timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for TeleopGoal {
    fn default() -> Self {
        Self {
            pos_m_rb: Point3::origin(),
            rot_rb: UnitQuaternion::identity(),
            aperture: 0.0,
            valid: false,
            timestamp: Utc::now(),
        }
    }
}

impl Default for GoalGen {
    fn default() -> Self {
        Self {
            params: Params::default(),
            cam_to_base: Isometry3::identity(),
            report: StatusReport::default(),
            filter: GoalFilter::default(),
            last_goal: None,
            grip_axis_rb: None,
            two_tong_rot_rb: None,
            ticks_without_markers: 0,
            tracking_lost: false,
            arch_goal: Archiver::default(),
            arch_report: Archiver::default(),
        }
    }
}

/// Flat CSV record of a goal.
#[derive(Serialize)]
struct GoalRecord {
    time_s: f64,
    pos_x_m: f64,
    pos_y_m: f64,
    pos_z_m: f64,
    quat_w: f64,
    quat_i: f64,
    quat_j: f64,
    quat_k: f64,
    aperture: f64,
    valid: bool,
}

impl State for GoalGen {
    type InitData = &'static str;
    type InitError = GoalGenError;

    type InputData = InputData;
    type OutputData = TeleopGoal;
    type StatusReport = StatusReport;
    type ProcError = GoalGenError;

    /// Initialise the GoalGen module.
    ///
    /// Expected init data is the path to the parameter file.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        // Load the parameters
        self.params = match params::load(init_data) {
            Ok(p) => p,
            Err(e) => return Err(GoalGenError::ParamLoadError(e)),
        };

        // Validate and resolve the calibration transform
        self.cam_to_base = self.params.validate()?;

        // Create the arch folder for goal_gen
        let mut arch_path = session.arch_root.clone();
        arch_path.push("goal_gen");
        std::fs::create_dir_all(arch_path).unwrap();

        // Initialise the archivers
        self.arch_goal = Archiver::from_path(session, "goal_gen/goal.csv").unwrap();
        self.arch_report =
            Archiver::from_path(session, "goal_gen/status_report.csv").unwrap();

        Ok(())
    }

    /// Perform cyclic processing of goal generation.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        // Clear the status report
        self.report = StatusReport::default();

        let dt_s = input_data.dt_s.max(0.0);

        // A stale frame counts as no markers at all
        let (left, right) = if input_data.frame_stale {
            (None, None)
        } else {
            (input_data.obs.left.as_ref(), input_data.obs.right.as_ref())
        };

        self.report.markers_visible =
            left.is_some() as u8 + right.is_some() as u8;

        // Fuse whatever is visible into a pre-filter target
        let fused = match (left, right) {
            (Some(l), Some(r)) => Some(self.fuse_two(l, r)),
            (Some(single), None) | (None, Some(single)) => self.fuse_one(single),
            (None, None) => None,
        };

        let goal = match fused {
            Some(target) => {
                if self.tracking_lost {
                    info!("Tong markers reacquired, goal valid again");
                }
                self.tracking_lost = false;
                self.ticks_without_markers = 0;

                // Advance the smoothing filters toward the fused target. In
                // degraded mode the aperture filter is not advanced, which
                // freezes the aperture at its last valid value.
                let (pos, rot) = self.filter.advance_pose(
                    target.pos_m_rb,
                    target.rot_rb,
                    dt_s,
                    self.params.pos_filter_tau_s,
                    self.params.rot_filter_tau_s,
                );

                let aperture = match target.aperture {
                    Some(a) => self.filter.advance_aperture(
                        a,
                        dt_s,
                        self.params.aperture_filter_tau_s,
                    ),
                    None => self.filter.aperture().unwrap_or(0.0),
                };

                TeleopGoal {
                    pos_m_rb: pos,
                    rot_rb: rot,
                    aperture,
                    valid: true,
                    timestamp: target.timestamp,
                }
            }
            None => {
                self.ticks_without_markers =
                    self.ticks_without_markers.saturating_add(1);

                if self.ticks_without_markers > self.params.loss_tick_limit
                    && !self.tracking_lost
                {
                    self.tracking_lost = true;
                    warn!(
                        "No tong markers for {} consecutive ticks, goal invalidated",
                        self.ticks_without_markers
                    );
                }

                // Hold the last goal, only the validity flag changes
                let mut held = self.last_goal.unwrap_or_default();
                held.valid = held.valid && !self.tracking_lost;
                held
            }
        };

        self.report.ticks_without_markers = self.ticks_without_markers;
        self.report.tracking_lost = self.tracking_lost;

        self.last_goal = Some(goal);

        Ok((goal, self.report))
    }
}

impl Archived for GoalGen {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(goal) = self.last_goal {
            let q = goal.rot_rb.quaternion();
            self.arch_goal.serialise(GoalRecord {
                time_s: get_elapsed_seconds(),
                pos_x_m: goal.pos_m_rb.x,
                pos_y_m: goal.pos_m_rb.y,
                pos_z_m: goal.pos_m_rb.z,
                quat_w: q.w,
                quat_i: q.i,
                quat_j: q.j,
                quat_k: q.k,
                aperture: goal.aperture,
                valid: goal.valid,
            })?;
        }

        self.arch_report.serialise(self.report)?;

        Ok(())
    }
}

impl GoalGen {
    /// Fuse both tong observations into a target.
    ///
    /// Translation tracks the midpoint of the tongs, rotation tracks the
    /// inter-tong line and the mean marker normal, aperture tracks the
    /// inter-tong distance.
    fn fuse_two(&mut self, left: &MarkerObservation, right: &MarkerObservation) -> FusedTarget {
        let c = &self.params.calibration;

        let p_l = self.cam_to_base * left.pos_m_cam;
        let p_r = self.cam_to_base * right.pos_m_cam;

        let mut midpoint = Point3::from((p_l.coords + p_r.coords) * 0.5);

        let separation = p_r - p_l;
        let dist = separation.norm();

        // Aperture from the inter-marker distance, rescaled between the
        // calibrated closed and open distances
        let aperture_raw = clamp(
            &lin_map(
                (c.grip_closed_dist_m, c.grip_open_dist_m),
                (0.0, 1.0),
                dist,
            ),
            &0.0,
            &1.0,
        );
        self.report.aperture_raw = aperture_raw;

        // Grip x axis along the inter-tong line. Coincident markers cannot
        // define a line, reuse the last axis in that case.
        let mut x_axis = if dist > 1e-6 {
            separation / dist
        } else {
            self.grip_axis_rb.unwrap_or_else(Vector3::x)
        };

        // Mean marker normal gives the grip z axis before orthogonalisation
        let mut normal = (self.cam_to_base.rotation * left.rot_cam) * Vector3::z()
            + (self.cam_to_base.rotation * right.rot_cam) * Vector3::z();

        if self.params.mirrored {
            midpoint.y = -midpoint.y;
            x_axis.y = -x_axis.y;
            normal.y = -normal.y;
        }

        // Orthogonalise the normal against the inter-tong axis
        let mut z_axis = normal - x_axis * normal.dot(&x_axis);
        if z_axis.norm() < 1e-6 {
            // Normal degenerate or parallel to the tong line, fall back to
            // the last orientation's z, or the base vertical
            z_axis = match self.two_tong_rot_rb {
                Some(r) => r * Vector3::z(),
                None => Vector3::z(),
            };
            z_axis = z_axis - x_axis * z_axis.dot(&x_axis);
            if z_axis.norm() < 1e-6 {
                z_axis = x_axis.cross(&Vector3::y());
            }
        }
        let z_axis = z_axis.normalize();
        let y_axis = z_axis.cross(&x_axis);

        let rot = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(
            Matrix3::from_columns(&[x_axis, y_axis, z_axis]),
        ));

        self.grip_axis_rb = Some(x_axis);
        self.two_tong_rot_rb = Some(rot);

        FusedTarget {
            pos_m_rb: midpoint,
            rot_rb: rot,
            aperture: Some(aperture_raw),
            timestamp: left.timestamp,
        }
    }

    /// Fuse a single tong observation into a degraded-mode target.
    ///
    /// Position comes from the visible tong plus the configured offset along
    /// the last known inter-tong axis, orientation is held at the last
    /// two-tong value and the aperture is frozen. Returns `None` before the
    /// first two-tong fix, there is nothing to hold yet.
    fn fuse_one(&mut self, obs: &MarkerObservation) -> Option<FusedTarget> {
        let rot = self.two_tong_rot_rb?;
        let axis = self.grip_axis_rb?;

        let mut p = self.cam_to_base * obs.pos_m_cam;
        if self.params.mirrored {
            p.y = -p.y;
        }

        // The left tong sits half a grip to the left of the centre, the
        // right tong half a grip to the right
        let sign = match obs.role {
            TongRole::LeftTong => 1.0,
            TongRole::RightTong => -1.0,
        };

        self.report.degraded = true;

        Some(FusedTarget {
            pos_m_rb: p + axis * (sign * self.params.single_tong_offset_m),
            rot_rb: rot,
            aperture: None,
            timestamp: obs.timestamp,
        })
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::super::CalibParams;
    use super::*;

    /// A goal generator with identity calibration and unfiltered outputs,
    /// bypassing file-based init.
    fn test_goal_gen(pos_tau_s: f64) -> GoalGen {
        let params = Params {
            pos_filter_tau_s: pos_tau_s,
            rot_filter_tau_s: 0.0,
            aperture_filter_tau_s: 0.0,
            loss_tick_limit: 5,
            single_tong_offset_m: 0.04,
            mirrored: false,
            calibration: CalibParams {
                cam_to_base_pos_m: [0.0; 3],
                cam_to_base_quat_wijk: [1.0, 0.0, 0.0, 0.0],
                grip_closed_dist_m: 0.03,
                grip_open_dist_m: 0.12,
            },
        };
        let cam_to_base = params.validate().unwrap();

        GoalGen {
            params,
            cam_to_base,
            ..GoalGen::default()
        }
    }

    fn observation(role: TongRole, pos: Point3<f64>) -> MarkerObservation {
        MarkerObservation {
            id: match role {
                TongRole::LeftTong => 3,
                TongRole::RightTong => 7,
            },
            role,
            pos_m_cam: pos,
            rot_cam: UnitQuaternion::identity(),
            confidence: 1.0,
            timestamp: Utc::now(),
        }
    }

    fn both_tongs(left: Point3<f64>, right: Point3<f64>) -> InputData {
        InputData {
            obs: TongObservations {
                left: Some(observation(TongRole::LeftTong, left)),
                right: Some(observation(TongRole::RightTong, right)),
                timestamp: Some(Utc::now()),
            },
            frame_stale: false,
            dt_s: 0.03,
        }
    }

    fn no_tongs() -> InputData {
        InputData {
            obs: TongObservations::default(),
            frame_stale: false,
            dt_s: 0.03,
        }
    }

    /// Markers `dist` apart along y, centred on (0.4, 0, 0.5).
    fn tongs_at_separation(dist: f64) -> InputData {
        both_tongs(
            Point3::new(0.4, -dist * 0.5, 0.5),
            Point3::new(0.4, dist * 0.5, 0.5),
        )
    }

    #[test]
    fn test_aperture_endpoint_mapping() {
        let mut gen = test_goal_gen(0.0);

        // At the closed reference distance the aperture is exactly 0
        let (goal, _) = gen.proc(&tongs_at_separation(0.03)).unwrap();
        assert_eq!(goal.aperture, 0.0);

        // At the open reference distance it is exactly 1
        let (goal, _) = gen.proc(&tongs_at_separation(0.12)).unwrap();
        assert_eq!(goal.aperture, 1.0);

        // Beyond either reference it clamps
        let (goal, _) = gen.proc(&tongs_at_separation(0.3)).unwrap();
        assert_eq!(goal.aperture, 1.0);

        let (goal, _) = gen.proc(&tongs_at_separation(0.01)).unwrap();
        assert_eq!(goal.aperture, 0.0);
    }

    #[test]
    fn test_two_tong_midpoint() {
        let mut gen = test_goal_gen(0.0);

        let (goal, report) = gen
            .proc(&both_tongs(
                Point3::new(0.4, -0.05, 0.5),
                Point3::new(0.4, 0.05, 0.5),
            ))
            .unwrap();

        assert!(goal.valid);
        assert_eq!(report.markers_visible, 2);
        assert!((goal.pos_m_rb - Point3::new(0.4, 0.0, 0.5)).norm() < 1e-12);
    }

    #[test]
    fn test_goal_invalidates_after_loss_limit() {
        let mut gen = test_goal_gen(0.0);

        let (goal_a, _) = gen.proc(&tongs_at_separation(0.1)).unwrap();
        assert!(goal_a.valid);

        // Ticks 1..=limit without markers hold the goal and keep it valid
        for _ in 0..5 {
            let (goal, _) = gen.proc(&no_tongs()).unwrap();
            assert!(goal.valid);
            assert_eq!(goal.pos_m_rb, goal_a.pos_m_rb);
        }

        // Tick limit+1 crosses the threshold
        let (goal, report) = gen.proc(&no_tongs()).unwrap();
        assert!(!goal.valid);
        assert!(report.tracking_lost);

        // Position and orientation still hold the last valid values
        assert_eq!(goal.pos_m_rb, goal_a.pos_m_rb);
        assert_eq!(goal.rot_rb, goal_a.rot_rb);
    }

    #[test]
    fn test_stale_frame_counts_as_absent() {
        let mut gen = test_goal_gen(0.0);

        let mut input = tongs_at_separation(0.1);
        input.frame_stale = true;

        let (_, report) = gen.proc(&input).unwrap();
        assert_eq!(report.markers_visible, 0);
        assert_eq!(report.ticks_without_markers, 1);
    }

    #[test]
    fn test_reacquire_converges_smoothly() {
        let mut gen = test_goal_gen(0.1);

        // Goal A
        let (goal_a, _) = gen
            .proc(&both_tongs(
                Point3::new(0.4, -0.05, 0.5),
                Point3::new(0.4, 0.05, 0.5),
            ))
            .unwrap();

        // Lose the markers past the limit
        for _ in 0..6 {
            gen.proc(&no_tongs()).unwrap();
        }

        // Reacquire at a new pose B
        let (goal, _) = gen
            .proc(&both_tongs(
                Point3::new(0.6, -0.05, 0.5),
                Point3::new(0.6, 0.05, 0.5),
            ))
            .unwrap();

        // Valid again, and converging toward B rather than jumping
        assert!(goal.valid);
        assert!(goal.pos_m_rb.x > goal_a.pos_m_rb.x);
        assert!(goal.pos_m_rb.x < 0.6);
    }

    #[test]
    fn test_single_tong_degraded_mode() {
        let mut gen = test_goal_gen(0.0);

        // Establish the two-tong orientation and aperture first
        let (goal_two, _) = gen.proc(&tongs_at_separation(0.1)).unwrap();

        // Left tong only
        let input = InputData {
            obs: TongObservations {
                left: Some(observation(
                    TongRole::LeftTong,
                    Point3::new(0.4, -0.05, 0.5),
                )),
                right: None,
                timestamp: Some(Utc::now()),
            },
            frame_stale: false,
            dt_s: 0.03,
        };

        let (goal, report) = gen.proc(&input).unwrap();

        assert!(goal.valid);
        assert!(report.degraded);
        assert_eq!(report.markers_visible, 1);

        // Position is the tong plus the configured offset along the
        // inter-tong axis (+y here)
        assert!((goal.pos_m_rb - Point3::new(0.4, -0.01, 0.5)).norm() < 1e-12);

        // Orientation held, aperture frozen at the last valid value
        assert_eq!(goal.rot_rb, goal_two.rot_rb);
        assert_eq!(goal.aperture, goal_two.aperture);
    }

    #[test]
    fn test_single_tong_before_any_fix_is_absent() {
        let mut gen = test_goal_gen(0.0);

        let input = InputData {
            obs: TongObservations {
                left: Some(observation(
                    TongRole::LeftTong,
                    Point3::new(0.4, -0.05, 0.5),
                )),
                right: None,
                timestamp: Some(Utc::now()),
            },
            frame_stale: false,
            dt_s: 0.03,
        };

        // With no previous two-tong fix there is no orientation to hold
        let (goal, _) = gen.proc(&input).unwrap();
        assert!(!goal.valid);
    }

    #[test]
    fn test_mirrored_mapping_flips_y() {
        let mut gen = test_goal_gen(0.0);
        gen.params.mirrored = true;

        let (goal, _) = gen
            .proc(&both_tongs(
                Point3::new(0.4, 0.1, 0.5),
                Point3::new(0.4, 0.2, 0.5),
            ))
            .unwrap();

        assert!((goal.pos_m_rb - Point3::new(0.4, -0.15, 0.5)).norm() < 1e-12);
    }
}

