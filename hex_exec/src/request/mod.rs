//! # Motion request module
//!
//! The motion request holds everything input sources ask of the motion core. It is written through
//! the [`RequestSurface`] by any number of threads and read by the control loop as one consistent
//! snapshot per tick.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod surface;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use comms_if::{eqpt::NUM_LEGS, tc::{ActiveFunction, GaitType}};
use crate::{body_ctrl::BodyPose, gait_ctrl::TravelVector};

pub use surface::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Default time for one gait step.
///
/// Units: milliseconds
pub const DEFAULT_GAIT_SPEED_MS: u32 = 70;

/// Default foot lift height.
///
/// Units: millimeters
pub const DEFAULT_LEG_LIFT_HEIGHT: f64 = 50.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Requested motion parameters.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct MotionRequest {
    /// Travel per gait cycle
    pub travel: TravelVector,

    /// Time for one gait step.
    ///
    /// Units: milliseconds
    pub gait_speed_ms: u32,

    /// Units: millimeters
    pub leg_lift_height: f64,

    pub body: BodyPose,

    pub gait_type: GaitType,

    /// Height correction added to each leg's target, in `LegId::ALL` order.
    ///
    /// Units: millimeters
    pub leg_y_offset: [f64; NUM_LEGS],

    /// Whether the hexapod should be moving
    pub enabled: bool,

    pub active_function: ActiveFunction,

    /// Incremented on every change to the request
    pub revision: u64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for MotionRequest {
    fn default() -> Self {
        Self {
            travel: TravelVector::default(),
            gait_speed_ms: DEFAULT_GAIT_SPEED_MS,
            leg_lift_height: DEFAULT_LEG_LIFT_HEIGHT,
            body: BodyPose::default(),
            gait_type: GaitType::default(),
            leg_y_offset: [0.0; NUM_LEGS],
            enabled: false,
            active_function: ActiveFunction::default(),
            revision: 0
        }
    }
}
