//! Recorded session handling
//!
//! Every commanded joint configuration is archived per-cycle as a flat CSV
//! row in the session's archive directory. This module defines that record
//! and the loader the playback executable uses to replay a recorded session
//! through the arm driver.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use std::path::Path;

// Internal
use crate::arm_kin::ArmConfig;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors when loading a recording.
#[derive(Debug, thiserror::Error)]
pub enum RecordingError {
    #[error("Cannot open the recording: {0}")]
    OpenError(csv::Error),

    #[error("Cannot parse the recording: {0}")]
    ParseError(csv::Error),

    #[error("The recording contains no joint configurations")]
    EmptyRecording,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One commanded joint configuration, stamped with session-elapsed time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct JointConfigRecord {
    /// Session-elapsed time the configuration was commanded at.
    ///
    /// Units: seconds
    pub time_s: f64,

    pub lift_m: f64,
    pub arm_ext_m: f64,
    pub wrist_yaw_rad: f64,
    pub wrist_pitch_rad: f64,
    pub wrist_roll_rad: f64,
    pub gripper: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl JointConfigRecord {
    /// Build a record from a commanded configuration.
    pub fn from_config(time_s: f64, config: &ArmConfig) -> Self {
        Self {
            time_s,
            lift_m: config.lift_m,
            arm_ext_m: config.arm_ext_m,
            wrist_yaw_rad: config.wrist_yaw_rad,
            wrist_pitch_rad: config.wrist_pitch_rad,
            wrist_roll_rad: config.wrist_roll_rad,
            gripper: config.gripper,
        }
    }

    /// Recover the joint configuration from a record.
    pub fn to_config(&self) -> ArmConfig {
        ArmConfig {
            lift_m: self.lift_m,
            arm_ext_m: self.arm_ext_m,
            wrist_yaw_rad: self.wrist_yaw_rad,
            wrist_pitch_rad: self.wrist_pitch_rad,
            wrist_roll_rad: self.wrist_roll_rad,
            gripper: self.gripper,
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a recorded session from a joint target archive CSV.
pub fn load_recording<P: AsRef<Path>>(path: P) -> Result<Vec<JointConfigRecord>, RecordingError> {
    let mut reader = csv::Reader::from_path(path).map_err(RecordingError::OpenError)?;

    let mut records = Vec::new();

    for result in reader.deserialize() {
        let record: JointConfigRecord = result.map_err(RecordingError::ParseError)?;
        records.push(record);
    }

    if records.is_empty() {
        return Err(RecordingError::EmptyRecording);
    }

    Ok(records)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_record_round_trip() {
        let config = ArmConfig {
            lift_m: 0.4,
            arm_ext_m: 0.2,
            wrist_yaw_rad: 1.0,
            wrist_pitch_rad: -0.3,
            wrist_roll_rad: 0.7,
            gripper: 0.9,
        };

        let record = JointConfigRecord::from_config(1.5, &config);

        assert_eq!(record.to_config(), config);
        assert_eq!(record.time_s, 1.5);
    }

    #[test]
    fn test_load_recording() {
        let mut path = std::env::temp_dir();
        path.push("teleop_test_recording.csv");

        {
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(
                file,
                "time_s,lift_m,arm_ext_m,wrist_yaw_rad,wrist_pitch_rad,wrist_roll_rad,gripper"
            )
            .unwrap();
            writeln!(file, "0.0,0.5,0.1,0.0,0.0,0.0,0.5").unwrap();
            writeln!(file, "0.03,0.51,0.11,0.01,0.0,0.0,0.5").unwrap();
        }

        let records = load_recording(&path).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].lift_m, 0.51);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_empty_recording_rejected() {
        let mut path = std::env::temp_dir();
        path.push("teleop_test_empty_recording.csv");

        {
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(
                file,
                "time_s,lift_m,arm_ext_m,wrist_yaw_rad,wrist_pitch_rad,wrist_roll_rad,gripper"
            )
            .unwrap();
        }

        let result = load_recording(&path);
        assert!(matches!(result, Err(RecordingError::EmptyRecording)));

        std::fs::remove_file(&path).ok();
    }
}
