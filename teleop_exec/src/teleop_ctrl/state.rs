//! Implementations for the TeleopCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use nalgebra::Translation3;
use serde::Serialize;
use std::collections::HashMap;

// Internal
use super::{Params, TeleopCtrlError};
use crate::arm_kin::{ArmConfig, ArmKin, JointFlags, Kinematics, Pose};
use crate::goal_gen::TeleopGoal;
use crate::recording::JointConfigRecord;
use util::{
    archive::{Archived, Archiver},
    module::State,
    params,
    session::{get_elapsed_seconds, Session},
};

use eqpt_if::eqpt::arm::{ArmDems, ArmJoint, ArmSensData, ARM_JOINT_IDS};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Teleop control module state
#[derive(Default)]
pub struct TeleopCtrl {
    params: Params,

    /// The kinematic model, built during init.
    kin: Option<ArmKin>,

    mode: TeleopMode,

    /// True once the starting configuration command has been issued.
    start_cmd_sent: bool,

    /// True once the shutdown hold command has been issued.
    shutdown_cmd_sent: bool,

    /// The last commanded configuration, the seed for the next solve and the
    /// hold target while tracking is lost.
    last_cmd: Option<ArmConfig>,

    /// True while the wrist is inside the singular region.
    singular_active: bool,

    /// Seconds accumulated since the last unreachable-target log message.
    unreachable_log_elapsed_s: f64,

    report: StatusReport,

    arch_target: Archiver,
    arch_report: Archiver,
}

/// Input data to teleop control.
#[derive(Default)]
pub struct InputData {
    /// The goal produced by the goal generator this tick.
    pub goal: TeleopGoal,

    /// Joint telemetry read at the top of the tick.
    pub sens: ArmSensData,

    /// True once a stop has been requested, observed at the top of a tick.
    pub stop_requested: bool,

    /// Elapsed time since the previous tick.
    ///
    /// Units: seconds
    pub dt_s: f64,
}

/// Status report for TeleopCtrl processing.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct StatusReport {
    /// The mode at the end of the tick.
    pub mode: TeleopMode,

    /// Which joints had their per-tick delta rate limited.
    pub rate_limited: JointFlags,

    /// True if the solved target required clamping.
    pub unreachable: bool,

    /// True if motion was suppressed because of an unreachable target.
    pub motion_suppressed: bool,

    /// True while the wrist orientation is in the singular region.
    pub singular: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The control loop's run-time states.
///
/// `Tracking` and `Holding` are the steady states, `ShuttingDown` is
/// terminal and reachable from every state.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum TeleopMode {
    Initialising,
    Tracking,
    Holding,
    ShuttingDown,
}

impl Default for TeleopMode {
    fn default() -> Self {
        TeleopMode::Initialising
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for TeleopCtrl {
    /// Paths to the control parameter file and the kinematic model parameter
    /// file.
    type InitData = (&'static str, &'static str);
    type InitError = TeleopCtrlError;

    type InputData = InputData;
    type OutputData = Option<ArmDems>;
    type StatusReport = StatusReport;
    type ProcError = TeleopCtrlError;

    /// Initialise the TeleopCtrl module.
    ///
    /// Loads and validates both parameter sets. A malformed kinematic model
    /// is fatal here, before any motion can be commanded.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        let (params_file, kin_params_file) = init_data;

        // Load the parameters
        self.params = match params::load(params_file) {
            Ok(p) => p,
            Err(e) => return Err(TeleopCtrlError::ParamLoadError(e)),
        };
        self.params.validate()?;

        // Load and validate the kinematic model
        let kin_params = match params::load(kin_params_file) {
            Ok(p) => p,
            Err(e) => return Err(TeleopCtrlError::ParamLoadError(e)),
        };
        self.kin = Some(ArmKin::new(kin_params).map_err(TeleopCtrlError::KinModelError)?);

        // First unreachable condition logs immediately
        self.unreachable_log_elapsed_s = self.params.unreachable_log_backoff_s;

        // Create the arch folder for teleop_ctrl
        let mut arch_path = session.arch_root.clone();
        arch_path.push("teleop_ctrl");
        std::fs::create_dir_all(arch_path).unwrap();

        // Initialise the archivers
        self.arch_target =
            Archiver::from_path(session, "teleop_ctrl/joint_targets.csv").unwrap();
        self.arch_report =
            Archiver::from_path(session, "teleop_ctrl/status_report.csv").unwrap();

        Ok(())
    }

    /// Perform cyclic processing of teleop control.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        // Clear the status report
        self.report = StatusReport::default();

        self.unreachable_log_elapsed_s += input_data.dt_s.max(0.0);

        // A stop request beats everything else, observed at the top of the
        // tick so an in-flight command is never pre-empted
        if input_data.stop_requested && self.mode != TeleopMode::ShuttingDown {
            info!("Stop requested, shutting down");
            self.mode = TeleopMode::ShuttingDown;
        }

        let output = match self.mode {
            TeleopMode::Initialising => self.mode_initialising(input_data),
            TeleopMode::Tracking => self.mode_tracking(input_data),
            TeleopMode::Holding => self.mode_holding(input_data),
            TeleopMode::ShuttingDown => self.mode_shutting_down(input_data),
        };

        self.report.mode = self.mode;

        Ok((output, self.report))
    }
}

impl Archived for TeleopCtrl {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(cmd) = self.last_cmd {
            self.arch_target
                .serialise(JointConfigRecord::from_config(get_elapsed_seconds(), &cmd))?;
        }

        self.arch_report.serialise(self.report)?;

        Ok(())
    }
}

impl TeleopCtrl {
    /// Target period of one control cycle, for the executable's scheduler.
    pub fn cycle_period_s(&self) -> f64 {
        self.params.cycle_period_s
    }

    /// The current mode.
    pub fn mode(&self) -> TeleopMode {
        self.mode
    }

    /// True once the shutdown command has been issued and the module has
    /// nothing further to do.
    pub fn finished(&self) -> bool {
        self.mode == TeleopMode::ShuttingDown && self.shutdown_cmd_sent
    }

    /// The starting configuration from the parameters.
    fn start_config(&self) -> ArmConfig {
        ArmConfig {
            lift_m: self.params.start_lift_m,
            arm_ext_m: self.params.start_arm_ext_m,
            wrist_yaw_rad: self.params.start_wrist_yaw_rad,
            wrist_pitch_rad: self.params.start_wrist_pitch_rad,
            wrist_roll_rad: self.params.start_wrist_roll_rad,
            gripper: self.params.start_gripper,
        }
    }

    /// The active speed scale from the operating-mode flags.
    fn speed_scale(&self) -> f64 {
        if self.params.reduced_speed {
            self.params.reduced_speed_scale
        } else {
            1.0
        }
    }

    /// Per-joint speed limits scaled by the given factor.
    fn speed_map(&self, scale: f64) -> HashMap<ArmJoint, f64> {
        let mut map = HashMap::new();

        for id in ARM_JOINT_IDS.iter() {
            map.insert(*id, self.params.max_vel(*id) * scale);
        }

        map
    }

    /// Initialisation: command the starting configuration once, then wait
    /// for the first valid goal.
    fn mode_initialising(&mut self, input: &InputData) -> Option<ArmDems> {
        if !self.start_cmd_sent {
            self.start_cmd_sent = true;

            let start = self.start_config();
            self.last_cmd = Some(start);

            info!("Commanding starting configuration");

            return Some(start.to_dems(&self.speed_map(self.params.start_speed_scale)));
        }

        if input.goal.valid {
            info!("First valid goal received, tracking");
            self.mode = TeleopMode::Tracking;
            return self.mode_tracking(input);
        }

        None
    }

    /// Tracking: solve the goal and command the rate-limited target.
    fn mode_tracking(&mut self, input: &InputData) -> Option<ArmDems> {
        if !input.goal.valid {
            info!("Goal invalid, holding last commanded target");
            self.mode = TeleopMode::Holding;
            return self.hold_dems();
        }

        let kin = match self.kin.as_ref() {
            Some(k) => k,
            None => return None,
        };

        // Seed the solver with the last commanded configuration for angle
        // continuity, falling back to the measured state on the first solve
        let seed = self
            .last_cmd
            .unwrap_or_else(|| ArmConfig::from_sens(&input.sens));

        let goal_pose = Pose::from_parts(
            Translation3::from(input.goal.pos_m_rb.coords),
            input.goal.rot_rb,
        );

        let target = kin.inverse(&goal_pose, input.goal.aperture, &seed);

        // Log entry into and exit from the singular region once each
        if target.singular != self.singular_active {
            if target.singular {
                debug!("Wrist orientation entered singular region, yaw/roll split held");
            } else {
                debug!("Wrist orientation left singular region");
            }
            self.singular_active = target.singular;
        }
        self.report.singular = target.singular;

        if !target.reachable {
            self.report.unreachable = true;

            // Rate-limited logging, this can otherwise fire every tick
            if self.unreachable_log_elapsed_s >= self.params.unreachable_log_backoff_s {
                self.unreachable_log_elapsed_s = 0.0;
                warn!(
                    "Target clamped to joint limits ({:?})",
                    target.limited
                );
            }

            if self.params.suppress_unreachable {
                self.report.motion_suppressed = true;
                return self.hold_dems();
            }
        }

        // Bound the per-tick command delta independently of the solver's
        // clamping
        let limited = self.rate_limit(&seed, &target.config, input.dt_s);
        self.last_cmd = Some(limited);

        Some(limited.to_dems(&self.speed_map(self.speed_scale())))
    }

    /// Holding: keep commanding the last target until the goal is valid
    /// again. Never freewheel.
    fn mode_holding(&mut self, input: &InputData) -> Option<ArmDems> {
        if input.goal.valid {
            info!("Goal valid again, resuming tracking");
            self.mode = TeleopMode::Tracking;
            return self.mode_tracking(input);
        }

        self.hold_dems()
    }

    /// Shutting down: one decelerate-and-hold command at the measured
    /// position, then nothing.
    fn mode_shutting_down(&mut self, input: &InputData) -> Option<ArmDems> {
        if self.shutdown_cmd_sent {
            return None;
        }

        self.shutdown_cmd_sent = true;

        let hold = ArmConfig::from_sens(&input.sens);
        self.last_cmd = Some(hold);

        info!("Commanding decelerate-and-hold");

        Some(hold.to_dems(&self.speed_map(self.params.reduced_speed_scale)))
    }

    /// Demands maintaining the last commanded target.
    fn hold_dems(&self) -> Option<ArmDems> {
        self.last_cmd
            .map(|cmd| cmd.to_dems(&self.speed_map(self.speed_scale())))
    }

    /// Clamp the per-joint delta between the previous and new commands to
    /// the configured velocity limits.
    fn rate_limit(&mut self, from: &ArmConfig, to: &ArmConfig, dt_s: f64) -> ArmConfig {
        let scale = self.speed_scale();
        let mut limited = *to;

        for id in ARM_JOINT_IDS.iter() {
            let max_delta = self.params.max_vel(*id) * scale * dt_s.max(0.0);
            let delta = to.value(*id) - from.value(*id);

            if delta.abs() > max_delta {
                limited.set_value(*id, from.value(*id) + max_delta * delta.signum());
                self.report.rate_limited.set(*id);
            }
        }

        limited
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
