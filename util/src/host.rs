//! Host platform utility functions

use std::path::PathBuf;

/// Name of the environment variable giving the software root directory.
pub const SW_ROOT_ENV_VAR: &str = "DEX_TELEOP_SW_ROOT";

/// Get the root directory of the software from the environment.
///
/// All session and parameter paths are resolved relative to this directory.
pub fn get_sw_root() -> Result<PathBuf, std::env::VarError> {
    Ok(PathBuf::from(std::env::var(SW_ROOT_ENV_VAR)?))
}

/// Get a short description of the host this executable is running on.
pub fn get_host_description() -> String {
    let hostname = std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| String::from("unknown-host"));

    format!("{} ({})", hostname, std::env::consts::OS)
}
