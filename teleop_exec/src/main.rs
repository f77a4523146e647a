//! Main teleop executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules and equipment
//!     - Spawn the marker acquisition thread
//!     - Main loop (fixed rate):
//!         - Joint telemetry acquisition
//!         - Goal generation from the latest tong observations
//!         - Teleop control processing (state machine, IK, rate limiting)
//!         - Actuator demand dispatch
//!
//! # Modules
//!
//! All cyclic modules (e.g. `goal_gen`, `teleop_ctrl`) shall provide a public
//! struct implementing the `util::module::State` trait.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use teleop_lib::{
    data_store::DataStore,
    goal_gen, marker_pose,
    marker_pose::{sim::SimMarkerCamera, MarkerPoseExtractor, TongObservations},
    mech_driver::{MechDriver, SimMechDriver},
    teleop_ctrl,
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::Utc;
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use eqpt_if::eqpt::arm::ArmDemsResponse;
use util::{
    archive::Archived,
    host,
    latest::latest_pair,
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session =
        Session::new("teleop_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Dex Teleop Executable\n");
    info!("Running on: {}", host::get_host_description());
    info!("Session directory: {:?}\n", session.session_root);

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    ds.goal_gen
        .init("goal_gen.toml", &session)
        .wrap_err("Failed to initialise GoalGen")?;
    info!("GoalGen init complete");

    ds.teleop_ctrl
        .init(("teleop_ctrl.toml", "arm_kin.toml"), &session)
        .wrap_err("Failed to initialise TeleopCtrl")?;
    info!("TeleopCtrl init complete");

    let cycle_period_s = ds.teleop_ctrl.cycle_period_s();
    info!("Module initialisation complete\n");

    // ---- INITIALISE EQUIPMENT ----

    info!("Initialising equipment");

    let marker_params: marker_pose::Params = util::params::load("marker_pose.toml")
        .wrap_err("Could not load marker pose params")?;
    let stale_frame_limit_s = marker_params.stale_frame_limit_s;

    // The sim camera stands in for the webcam and detector
    let camera = Box::new(SimMarkerCamera::from_params(&marker_params));
    let extractor = MarkerPoseExtractor::new(marker_params)
        .wrap_err("Failed to initialise the marker pose extractor")?;
    info!("Marker pose extractor initialised");

    let mut mech_driver = SimMechDriver::new(
        util::params::load("mech_driver.toml").wrap_err("Could not load mech driver params")?,
    );
    info!("Mech driver initialised");

    info!("Equipment initialisation complete");

    // ---- START THREADS ----

    let stop = Arc::new(AtomicBool::new(false));
    let (obs_writer, obs_reader) = latest_pair();

    {
        let stop = stop.clone();
        thread::spawn(move || marker_pose::acquisition_main(camera, extractor, obs_writer, stop));
    }

    // Stop input: ENTER on stdin requests a cooperative shutdown
    {
        let stop = stop.clone();
        thread::spawn(move || {
            let mut buf = String::new();
            std::io::stdin().read_line(&mut buf).ok();
            stop.store(true, Ordering::Relaxed);
        });
    }

    info!("Press ENTER to stop\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    // The last observations taken from the slot, reused on ticks where no
    // new frame arrived
    let mut last_obs = TongObservations::default();

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start(1.0 / cycle_period_s);

        // ---- DATA INPUT ----

        ds.arm_sens = match mech_driver.read_sens() {
            Ok(s) => s,
            Err(e) => {
                // A telemetry failure is fatal, attempt a best-effort stop
                // and surface the error to the operator
                error!("Joint telemetry read failed: {}", e);
                mech_driver.safe_stop().ok();
                return Err(e).wrap_err("Arm driver failure, stopping");
            }
        };

        // Non-blocking: if no new observations arrived this tick the last
        // set is reused and judged on its age
        if let Some(obs) = obs_reader.take() {
            last_obs = obs;
        }

        let frame_stale = match last_obs.timestamp {
            Some(ts) => {
                let age_s = (Utc::now() - ts).num_milliseconds() as f64 * 0.001;
                age_s > stale_frame_limit_s
            }
            None => true,
        };

        // ---- GOAL GENERATION ----

        ds.goal_gen_input = goal_gen::InputData {
            obs: last_obs.clone(),
            frame_stale,
            dt_s: cycle_period_s,
        };

        match ds.goal_gen.proc(&ds.goal_gen_input) {
            Ok((goal, report)) => {
                ds.goal = goal;
                ds.goal_gen_status_rpt = report;
            }
            Err(e) => warn!("Error during GoalGen processing: {}", e),
        };

        // ---- CONTROL ALGORITHM PROCESSING ----

        ds.teleop_ctrl_input = teleop_ctrl::InputData {
            goal: ds.goal,
            sens: ds.arm_sens.clone(),
            stop_requested: stop.load(Ordering::Relaxed),
            dt_s: cycle_period_s,
        };

        match ds.teleop_ctrl.proc(&ds.teleop_ctrl_input) {
            Ok((dems, report)) => {
                ds.arm_dems = dems;
                ds.teleop_ctrl_status_rpt = report;
            }
            Err(e) => warn!("Error during TeleopCtrl processing: {}", e),
        };

        // ---- COMMAND ACTUATORS ----

        if let Some(ref dems) = ds.arm_dems {
            match mech_driver.send_dems(dems) {
                Ok(ArmDemsResponse::DemsOk) => (),
                Ok(r) => warn!("Received non-nominal response from arm driver: {:?}", r),
                Err(e) => {
                    error!("Joint demand dispatch failed: {}", e);
                    mech_driver.safe_stop().ok();
                    return Err(e).wrap_err("Arm driver failure, stopping");
                }
            }
        }

        // 1Hz heartbeat with the state the operator cares about
        if ds.is_1_hz_cycle {
            debug!(
                "mode: {:?}, markers: {}, goal valid: {}",
                ds.teleop_ctrl_status_rpt.mode,
                ds.goal_gen_status_rpt.markers_visible,
                ds.goal.valid
            );
        }

        // ---- WRITE ARCHIVES ----

        if let Err(e) = ds.goal_gen.write() {
            warn!("Could not write GoalGen archives: {}", e);
        }
        if let Err(e) = ds.teleop_ctrl.write() {
            warn!("Could not write TeleopCtrl archives: {}", e);
        }

        // ---- EXIT CHECK ----

        if ds.teleop_ctrl.finished() {
            info!("Shutdown command issued, leaving main loop");
            break;
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;
        ds.record_cycle_dur(cycle_dur.as_secs_f64());

        // Get sleep duration. On overrun the next tick is scheduled
        // immediately, the loop never skips ticks to catch up and never
        // reissues a stale command.
        match Duration::from_secs_f64(cycle_period_s).checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - cycle_period_s
                );
                ds.num_consec_cycle_overruns += 1;
                ds.num_cycle_overruns += 1;
            }
        }

        // Increment cycle counter
        ds.num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    // Stop the acquisition thread
    stop.store(true, Ordering::Relaxed);

    if let Err(e) = mech_driver.safe_stop() {
        warn!("Final safe stop failed: {}", e);
    }

    // Save the run statistics into the session
    session.save("cycle_stats.json", ds.cycle_stats());

    info!("End of execution");

    session.exit();

    Ok(())
}
