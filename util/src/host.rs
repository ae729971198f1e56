//! Host platform utility functions

use std::env;
use std::path::PathBuf;

/// Name of the environment variable pointing at the software root.
pub const SW_ROOT_ENV_VAR: &str = "HEX_SW_ROOT";

/// Get the root directory of the hexapod software.
///
/// The root is read from the `HEX_SW_ROOT` environment variable and is the
/// directory containing `params/` and `sessions/`.
pub fn get_hex_sw_root() -> Result<PathBuf, env::VarError> {
    env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}
