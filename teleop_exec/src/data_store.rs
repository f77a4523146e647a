//! # Data Store

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use crate::{goal_gen, teleop_ctrl};
use eqpt_if::eqpt::arm::{ArmDems, ArmSensData};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// True if this cycle falls on a 1Hz boundary
    pub is_1_hz_cycle: bool,

    // Goal generation
    pub goal_gen: goal_gen::GoalGen,
    pub goal_gen_input: goal_gen::InputData,
    pub goal: goal_gen::TeleopGoal,
    pub goal_gen_status_rpt: goal_gen::StatusReport,

    // Teleop control
    pub teleop_ctrl: teleop_ctrl::TeleopCtrl,
    pub teleop_ctrl_input: teleop_ctrl::InputData,
    pub arm_dems: Option<ArmDems>,
    pub teleop_ctrl_status_rpt: teleop_ctrl::StatusReport,

    // Telemetry
    /// Joint telemetry read at the top of the current cycle.
    pub arm_sens: ArmSensData,

    // Monitoring counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,

    /// Total number of cycle overruns
    pub num_cycle_overruns: u64,

    /// Accumulated cycle durations, for the end-of-run statistics
    pub sum_cycle_dur_s: f64,

    /// Longest observed cycle duration
    pub max_cycle_dur_s: f64,
}

/// End-of-run cycle statistics, saved into the session.
#[derive(Serialize)]
pub struct CycleStats {
    pub num_cycles: u128,
    pub num_overruns: u64,
    pub mean_cycle_dur_s: f64,
    pub max_cycle_dur_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle, and
    /// sets the 1Hz cycle flag.
    pub fn cycle_start(&mut self, cycle_frequency_hz: f64) {
        self.is_1_hz_cycle = self.num_cycles % (cycle_frequency_hz as u128) == 0;

        self.goal_gen_input = goal_gen::InputData::default();
        self.teleop_ctrl_input = teleop_ctrl::InputData::default();
        self.arm_dems = None;
        self.goal_gen_status_rpt = goal_gen::StatusReport::default();
        self.teleop_ctrl_status_rpt = teleop_ctrl::StatusReport::default();
    }

    /// Record the duration of a completed cycle.
    pub fn record_cycle_dur(&mut self, cycle_dur_s: f64) {
        self.sum_cycle_dur_s += cycle_dur_s;
        if cycle_dur_s > self.max_cycle_dur_s {
            self.max_cycle_dur_s = cycle_dur_s;
        }
    }

    /// Summarise the run's cycle statistics.
    pub fn cycle_stats(&self) -> CycleStats {
        CycleStats {
            num_cycles: self.num_cycles,
            num_overruns: self.num_cycle_overruns,
            mean_cycle_dur_s: if self.num_cycles > 0 {
                self.sum_cycle_dur_s / self.num_cycles as f64
            } else {
                0.0
            },
            max_cycle_dur_s: self.max_cycle_dur_s,
        }
    }
}
