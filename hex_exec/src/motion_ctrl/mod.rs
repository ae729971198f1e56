//! # Motion control module
//!
//! Motion control owns the gait sequencer and turns each snapshot of the motion request into a
//! frame of servo positions. It runs a small state machine:
//!
//! - `Idle`: movement is disabled, no frames are produced and the loop waits for a new request.
//! - `Active`: one frame is produced per tick, each lasting the requested gait speed.
//! - `ShuttingDown`: movement has just been disabled, the legs are given time to settle and then
//!   every servo is released.
//!
//! [`ControlLoop`] drives the module on its own thread, sending frames through a
//! [`ServoTransport`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod channels;
mod control_loop;
mod params;
mod servo_frame;
mod state;
mod transport;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;
use std::time::Duration;

use comms_if::eqpt::ServoFrame;
use util::{archive::ArchiveError, params::LoadError};
use crate::gait_ctrl::GaitPlanError;

pub use channels::*;
pub use control_loop::*;
pub use params::*;
pub use servo_frame::*;
pub use state::*;
pub use transport::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Operating mode of motion control.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum Mode {
    Idle,
    Active,
    ShuttingDown
}

/// What the control loop must do after a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlAction {
    /// Nothing to send, wait up to the given time for the request to change.
    Wait(Duration),

    /// Send the frame and wait for it to be applied.
    Move(ServoFrame),

    /// Wait for the legs to settle, then send the release frame.
    Release {
        settle: Duration,
        frame: ServoFrame
    }
}

/// Possible errors that can occur during MotionCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum MotionCtrlError {
    #[error("Could not load the motion control parameters: {0}")]
    ParamLoadError(LoadError),

    #[error("Could not load the servo channel map: {0}")]
    ChannelMapLoadError(LoadError),

    #[error("Invalid leg geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid joint limits: {0}")]
    InvalidJointLimits(String),

    #[error("Invalid servo channel map: {0}")]
    InvalidChannelMap(String),

    #[error("Invalid servo mapping divisor: {0}")]
    InvalidServoMapping(f64),

    #[error("Invalid gait plan: {0}")]
    InvalidGaitPlan(GaitPlanError),

    #[error("Could not open the motion control archive: {0}")]
    ArchiveError(ArchiveError)
}
