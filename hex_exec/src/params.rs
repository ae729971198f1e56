//! # Hexapod Executable Parameters
//!
//! This module provide parameters for the hexapod executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HexExecParams {

    /// Network endpoint for the telecommand client
    pub tc_endpoint: String,

    /// Network endpoint of the servo server
    pub servo_endpoint: String,

    /// Log frames instead of sending them to the servo server
    pub dry_run: bool,

    /// Period of the telecommand handling loop.
    ///
    /// Units: milliseconds
    pub cycle_period_ms: u64,

    /// Number of consecutive failed TC cycles after which the executable stops walking and shuts
    /// down
    #[serde(default = "default_max_tc_faults")]
    pub max_tc_faults: u32
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn default_max_tc_faults() -> u32 {
    50
}
