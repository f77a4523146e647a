//! Simulated arm driver
//!
//! First-order joint model stepped on every telemetry read: each joint moves
//! toward its demanded position with the configured time constant, capped at
//! the demand's speed limit. Used when running without hardware and by the
//! control loop tests.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::Utc;
use std::collections::HashMap;
use std::time::Instant;

// Internal
use super::{MechDriver, MechDriverError, Params};
use eqpt_if::eqpt::arm::{ArmDems, ArmDemsResponse, ArmJoint, ArmSensData, ARM_JOINT_IDS};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A simulated arm implementing the driver boundary.
pub struct SimMechDriver {
    params: Params,

    pos: HashMap<ArmJoint, f64>,
    speed: HashMap<ArmJoint, f64>,

    /// The demand set currently being acquired, `None` holds position.
    dems: Option<ArmDems>,

    last_step: Option<Instant>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimMechDriver {
    pub fn new(params: Params) -> Self {
        let mut pos = HashMap::new();
        let mut speed = HashMap::new();

        pos.insert(ArmJoint::Lift, params.initial_lift_m);
        pos.insert(ArmJoint::ArmExtend, params.initial_arm_ext_m);
        pos.insert(ArmJoint::WristYaw, params.initial_wrist_yaw_rad);
        pos.insert(ArmJoint::WristPitch, params.initial_wrist_pitch_rad);
        pos.insert(ArmJoint::WristRoll, params.initial_wrist_roll_rad);
        pos.insert(ArmJoint::Gripper, params.initial_gripper);

        for id in ARM_JOINT_IDS.iter() {
            speed.insert(*id, 0.0);
        }

        Self {
            params,
            pos,
            speed,
            dems: None,
            last_step: None,
        }
    }

    /// Advance the joint model by `dt_s` seconds.
    pub(crate) fn step_by(&mut self, dt_s: f64) {
        if dt_s <= 0.0 {
            return;
        }

        let tau = self.params.joint_time_const_s.max(1e-3);

        for id in ARM_JOINT_IDS.iter() {
            let current = self.pos.get(id).copied().unwrap_or(0.0);

            let (target, max_speed) = match &self.dems {
                Some(d) => (
                    d.pos.get(id).copied().unwrap_or(current),
                    d.max_speed.get(id).copied().unwrap_or(0.0),
                ),
                None => (current, 0.0),
            };

            // First-order approach, capped at the demanded speed limit. A
            // non-positive speed limit disables the joint.
            let speed = if max_speed > 0.0 {
                ((target - current) / tau).max(-max_speed).min(max_speed)
            } else {
                0.0
            };

            self.pos.insert(*id, current + speed * dt_s);
            self.speed.insert(*id, speed);
        }
    }
}

impl MechDriver for SimMechDriver {
    fn read_sens(&mut self) -> Result<ArmSensData, MechDriverError> {
        let now = Instant::now();

        if let Some(last) = self.last_step {
            self.step_by((now - last).as_secs_f64());
        }
        self.last_step = Some(now);

        Ok(ArmSensData {
            pos: self.pos.clone(),
            speed: self.speed.clone(),
            timestamp: Utc::now(),
        })
    }

    fn send_dems(&mut self, dems: &ArmDems) -> Result<ArmDemsResponse, MechDriverError> {
        // Reject demand sets containing non-finite values outright
        let all_finite = dems
            .pos
            .values()
            .chain(dems.max_speed.values())
            .all(|v| v.is_finite());

        if !all_finite {
            return Ok(ArmDemsResponse::DemsInvalid);
        }

        self.dems = Some(dems.clone());

        Ok(ArmDemsResponse::DemsOk)
    }

    fn safe_stop(&mut self) -> Result<(), MechDriverError> {
        // Dropping the demand set holds the current position
        self.dems = None;

        for id in ARM_JOINT_IDS.iter() {
            self.speed.insert(*id, 0.0);
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn test_driver() -> SimMechDriver {
        SimMechDriver::new(Params {
            joint_time_const_s: 0.1,
            ..Params::default()
        })
    }

    fn dems_for(joint: ArmJoint, pos: f64, max_speed: f64) -> ArmDems {
        let mut dems = ArmDems::default();
        dems.pos.insert(joint, pos);
        dems.max_speed.insert(joint, max_speed);
        dems
    }

    #[test]
    fn test_converges_to_demand() {
        let mut driver = test_driver();

        driver
            .send_dems(&dems_for(ArmJoint::Lift, 0.5, 1.0))
            .unwrap();

        for _ in 0..200 {
            driver.step_by(0.03);
        }

        assert!((driver.pos[&ArmJoint::Lift] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_speed_limit_respected() {
        let mut driver = test_driver();

        driver
            .send_dems(&dems_for(ArmJoint::ArmExtend, 10.0, 0.2))
            .unwrap();

        let before = driver.pos[&ArmJoint::ArmExtend];
        driver.step_by(0.1);
        let after = driver.pos[&ArmJoint::ArmExtend];

        assert!((after - before).abs() <= 0.2 * 0.1 + 1e-9);
    }

    #[test]
    fn test_non_finite_demand_rejected() {
        let mut driver = test_driver();

        let response = driver
            .send_dems(&dems_for(ArmJoint::Lift, f64::NAN, 1.0))
            .unwrap();

        assert_eq!(response, ArmDemsResponse::DemsInvalid);

        // The invalid demand was not retained
        driver.step_by(0.03);
        assert_eq!(driver.speed[&ArmJoint::Lift], 0.0);
    }

    #[test]
    fn test_safe_stop_holds_position() {
        let mut driver = test_driver();

        driver
            .send_dems(&dems_for(ArmJoint::Lift, 0.5, 1.0))
            .unwrap();
        driver.step_by(0.03);

        let held = driver.pos[&ArmJoint::Lift];
        driver.safe_stop().unwrap();
        driver.step_by(0.5);

        assert_eq!(driver.pos[&ArmJoint::Lift], held);
    }
}
