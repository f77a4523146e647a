//! Recorded session playback executable.
//!
//! Replays the joint configurations archived by a previous teleop session
//! through the arm driver at the recorded timing. Expects the path to a
//! joint target archive CSV as the first argument, with an optional playback
//! speed multiplier as the second.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{info, warn};
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

// Internal
use eqpt_if::eqpt::arm::ARM_JOINT_IDS;
use teleop_lib::{
    mech_driver::{MechDriver, SimMechDriver},
    recording::{self, JointConfigRecord},
    teleop_ctrl,
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Time allowed for the arm to settle on the first recorded configuration.
const SETTLE_TIME_S: f64 = 2.0;

/// Upper bound on the gap honoured between two records, so a recording with
/// a long idle period does not stall the playback.
const MAX_STEP_GAP_S: f64 = 1.0;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    let session =
        Session::new("playback", "sessions").wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    info!("Dex Teleop Playback Executable\n");
    info!("Running on: {}", host::get_host_description());

    // ---- ARGUMENTS ----

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args.len() > 3 {
        return Err(eyre!(
            "Expected a recording path and an optional speed multiplier, found {} argument(s)",
            args.len() - 1
        ));
    }

    let playback_speed: f64 = if args.len() == 3 {
        args[2]
            .parse()
            .wrap_err("Could not parse the playback speed multiplier")?
    } else {
        1.0
    };

    if !playback_speed.is_finite() || playback_speed <= 0.0 {
        return Err(eyre!("Playback speed must be positive, found {}", playback_speed));
    }

    // ---- LOAD RECORDING ----

    let records =
        recording::load_recording(&args[1]).wrap_err("Failed to load the recording")?;

    let duration_s = records.last().map(|r| r.time_s).unwrap_or(0.0)
        - records.first().map(|r| r.time_s).unwrap_or(0.0);

    info!(
        "Loaded recording \"{}\": {} configurations over {:.02} s\n",
        args[1],
        records.len(),
        duration_s
    );

    // ---- INITIALISE EQUIPMENT ----

    let ctrl_params: teleop_ctrl::Params = util::params::load("teleop_ctrl.toml")
        .wrap_err("Could not load teleop control params")?;
    ctrl_params
        .validate()
        .wrap_err("Teleop control params invalid")?;

    let mut mech_driver = SimMechDriver::new(
        util::params::load("mech_driver.toml").wrap_err("Could not load mech driver params")?,
    );
    info!("Mech driver initialised");

    // ---- MOVE TO STARTING CONFIGURATION ----

    info!("Moving to the first recorded configuration");

    send_record(
        &mut mech_driver,
        &records[0],
        &ctrl_params,
        ctrl_params.start_speed_scale,
    )?;
    thread::sleep(Duration::from_secs_f64(SETTLE_TIME_S));

    // ---- PLAYBACK ----

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        thread::spawn(move || {
            let mut buf = String::new();
            std::io::stdin().read_line(&mut buf).ok();
            stop.store(true, Ordering::Relaxed);
        });
    }

    info!("Playback started, press ENTER to stop\n");

    for pair in records.windows(2) {
        if stop.load(Ordering::Relaxed) {
            info!("Playback interrupted");
            break;
        }

        send_record(&mut mech_driver, &pair[0], &ctrl_params, 1.0)?;

        // Honour the recorded timing, scaled by the playback speed
        let gap_s = ((pair[1].time_s - pair[0].time_s) / playback_speed)
            .max(0.0)
            .min(MAX_STEP_GAP_S);
        thread::sleep(Duration::from_secs_f64(gap_s));
    }

    if let Some(last) = records.last() {
        if !stop.load(Ordering::Relaxed) {
            send_record(&mut mech_driver, last, &ctrl_params, 1.0)?;
            info!("Playback complete, {} configurations sent", records.len());
        }
    }

    // ---- SHUTDOWN ----

    if let Err(e) = mech_driver.safe_stop() {
        warn!("Final safe stop failed: {}", e);
    }

    info!("End of execution");

    session.exit();

    Ok(())
}

/// Send one recorded configuration to the driver at the given speed scale.
fn send_record(
    driver: &mut dyn MechDriver,
    record: &JointConfigRecord,
    params: &teleop_ctrl::Params,
    speed_scale: f64,
) -> Result<(), Report> {
    let mut max_speed = std::collections::HashMap::new();
    for id in ARM_JOINT_IDS.iter() {
        max_speed.insert(*id, params.max_vel(*id) * speed_scale);
    }

    let dems = record.to_config().to_dems(&max_speed);

    match driver.send_dems(&dems) {
        Ok(eqpt_if::eqpt::arm::ArmDemsResponse::DemsOk) => Ok(()),
        Ok(r) => {
            warn!("Received non-nominal response from arm driver: {:?}", r);
            Ok(())
        }
        Err(e) => {
            driver.safe_stop().ok();
            Err(e).wrap_err("Arm driver failure, stopping playback")
        }
    }
}
