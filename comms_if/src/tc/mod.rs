//! # Telecommand module
//!
//! This module provides telecommand functionality to the communications
//! interface. Telecommands are serialised as JSON objects tagged with their
//! `type`, for example:
//!
//! ```text
//! {"type": "Movement", "gait_speed_ms": 45, "travel_x": 0.0, "travel_z": -50.0, "travel_rot_y": 0.0}
//! ```

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod motion;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Serialize, Deserialize};
use structopt::{StructOpt, clap::AppSettings};
use thiserror::Error;

// Internal
use crate::eqpt::LegId;
pub use motion::{GaitType, ActiveFunction, MotionParseError};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand, i.e. an instruction sent to the hexapod by an input source.
///
/// Each telecommand maps onto one request surface operation of the motion
/// core.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize, StructOpt)]
#[serde(tag = "type")]
#[structopt(
    name = "hex",
    no_version,
    global_setting = AppSettings::AllowNegativeNumbers
)]
pub enum Tc {
    /// Check that the executable is responding.
    #[structopt(name = "hb")]
    Heartbeat,

    /// Set the travel vector and gait speed.
    #[structopt(name = "move")]
    Movement {
        /// Time the servos take to complete one gait step.
        ///
        /// Units: milliseconds
        gait_speed_ms: u32,

        /// Lateral travel per step, positive to the left.
        travel_x: f64,

        /// Longitudinal travel per step, negative is forwards.
        travel_z: f64,

        /// Rotation per step about the vertical axis.
        ///
        /// Units: degrees
        travel_rot_y: f64
    },

    /// Set the body pose relative to the neutral stance.
    #[structopt(name = "body")]
    BodyPosition {
        /// Units: degrees
        rot_x: f64,
        /// Units: degrees
        rot_z: f64,
        pos_x: f64,
        pos_z: f64,
        pos_y: f64,
        /// Units: degrees
        rot_y: f64
    },

    /// Set the gait speed and leg lift height.
    #[structopt(name = "gaitopts")]
    GaitOptions {
        /// Units: milliseconds
        gait_speed_ms: u32,

        leg_lift_height: f64
    },

    /// Switch the active gait.
    #[structopt(name = "gait")]
    GaitType {
        /// One of ripple12, tripod8, tt12, tt16, wave24, tripod6
        gait_type: GaitType
    },

    /// Enable or disable movement.
    #[structopt(name = "enable")]
    SetMovement {
        /// `true` to start walking, `false` to settle and release the servos
        #[structopt(parse(try_from_str))]
        enabled: bool
    },

    /// Apply a height correction to one leg.
    #[structopt(name = "legy")]
    LegYHeight {
        /// One of rr, rm, rf, lr, lm, lf
        leg: LegId,

        /// Added to the leg's target height, positive is down.
        offset: f64
    },

    /// Select the parameter group the input source is editing.
    #[structopt(name = "func")]
    ActiveFunction {
        /// One of walk, translate, rotate, leg
        function: ActiveFunction
    }
}

/// Responses that can be sent back to the source of a telecommand.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TcResponse {
    /// The TC was accepted and executed
    Ok,

    /// The TC could not be parsed
    Invalid,

    /// The TC was valid but cannot be executed right now
    CannotExecute
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("TC could not be serialised: {0}")]
    SerialiseError(serde_json::Error)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {

    /// Parse a new TC from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        serde_json::from_str(json_str).map_err(TcParseError::InvalidJson)
    }

    /// Serialise the TC into a JSON packet
    pub fn to_json(&self) -> Result<String, TcParseError> {
        serde_json::to_string(self).map_err(TcParseError::SerialiseError)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
