//! # Body control module
//!
//! Rotates and translates the body within the footprint of the legs. The displacement of each
//! foot caused by the body pose is computed about the body centre and removed from the leg's
//! target, so the feet stay where they are on the ground while the body moves above them.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod body_fk;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

pub use body_fk::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Height of the body above the neutral foot positions when standing.
///
/// Units: millimeters
pub const DEFAULT_BODY_HEIGHT: f64 = 65.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Pose of the body relative to its neutral stance.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyPose {
    /// Pitch.
    ///
    /// Units: degrees
    pub rot_x: f64,

    /// Yaw.
    ///
    /// Units: degrees
    pub rot_y: f64,

    /// Roll.
    ///
    /// Units: degrees
    pub rot_z: f64,

    /// Units: millimeters
    pub pos_x: f64,

    /// Height of the body, positive raises the body (feet move down relative to it).
    ///
    /// Units: millimeters
    pub pos_y: f64,

    /// Units: millimeters
    pub pos_z: f64
}

/// Offset of the centre of body rotation from the body centre.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RotationOffset {
    /// Units: millimeters
    pub y: f64,

    /// Units: millimeters
    pub z: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for BodyPose {
    fn default() -> Self {
        Self {
            rot_x: 0.0,
            rot_y: 0.0,
            rot_z: 0.0,
            pos_x: 0.0,
            pos_y: DEFAULT_BODY_HEIGHT,
            pos_z: 0.0
        }
    }
}
