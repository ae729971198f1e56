//! # Gait control module
//!
//! All six legs share one step counter. Each leg has a phase in the current [`GaitPlan`] which
//! places its lift window at a different point in the cycle, so the same state machine produces
//! tripod, ripple or wave gaits purely from the plan table.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod plan;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

pub use plan::*;
pub use state::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Requested travel per gait cycle.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TravelVector {
    /// Lateral travel, positive to the left.
    ///
    /// Units: millimeters
    pub x: f64,

    /// Longitudinal travel, negative is forwards.
    ///
    /// Units: millimeters
    pub z: f64,

    /// Rotation about the vertical axis.
    ///
    /// Units: degrees
    pub rot_y: f64
}

/// Input to one leg's gait step.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct GaitInput {
    pub travel: TravelVector,

    /// Whether the travel vector is outside of the dead zone
    pub travel_requested: bool,

    /// Height the feet are raised to at the top of the lift.
    ///
    /// Units: millimeters
    pub lift_height: f64
}

/// A leg's trajectory offset from its neutral position.
///
/// Negative `y` means the foot is in the air.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct GaitOffset {
    /// Units: millimeters
    pub x: f64,

    /// Units: millimeters
    pub y: f64,

    /// Units: millimeters
    pub z: f64,

    /// Units: degrees
    pub rot_y: f64
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors with gait plans.
#[derive(Debug, thiserror::Error)]
pub enum GaitPlanError {
    #[error("Gait {0:?} has {1} steps, expected at least 2")]
    TooFewSteps(comms_if::tc::GaitType, u32),

    #[error("Gait {0:?} has {1} lifted positions, expected 1 to 5 and fewer than the steps")]
    InvalidLiftedPositions(comms_if::tc::GaitType, u32),

    #[error("Gait {0:?} gives leg {1} phase {2}, expected 1 to {3}")]
    InvalidPhase(comms_if::tc::GaitType, comms_if::eqpt::LegId, u32, u32),

    #[error("Gait {0:?} has a non-positive divisor")]
    InvalidDivisor(comms_if::tc::GaitType)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TravelVector {
    /// Returns `true` if any component is beyond the dead zone.
    pub fn exceeds(&self, dead_zone: f64) -> bool {
        self.x.abs() > dead_zone
            || self.z.abs() > dead_zone
            || self.rot_y.abs() > dead_zone
    }
}

impl GaitOffset {
    pub fn is_airborne(&self) -> bool {
        self.y < 0.0
    }
}
