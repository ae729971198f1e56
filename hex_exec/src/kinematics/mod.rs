//! # Leg kinematics
//!
//! Closed form inverse kinematics for the three joint legs, and the matching forward kinematics
//! used to check solutions and estimate foot positions.
//!
//! ## Frames
//!
//! Leg targets are expressed in the leg frame: the origin is the coxa joint, X points outwards
//! from the body (mirrored for the right side), Y points down and Z points towards the rear.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod leg_fk;
mod leg_ik;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Serialize, Deserialize};
use comms_if::eqpt::LegId;

pub use leg_fk::*;
pub use leg_ik::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A position or displacement.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64
}

/// Link lengths, shared by all legs.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegDims {
    /// Units: millimeters
    pub coxa_length: f64,

    /// Units: millimeters
    pub femur_length: f64,

    /// Units: millimeters
    pub tibia_length: f64
}

/// Constant geometry of a single leg.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegGeometry {
    /// The leg this geometry describes
    pub leg: LegId,

    /// Lateral position of the coxa joint relative to the body centre, positive to the left.
    ///
    /// Units: millimeters
    pub offset_x: f64,

    /// Longitudinal position of the coxa joint relative to the body centre, positive to the rear.
    ///
    /// Units: millimeters
    pub offset_z: f64,

    /// Angle the coxa is mounted at relative to the body's lateral axis.
    ///
    /// Units: degrees
    pub mount_angle_deg: f64,

    /// Neutral foot position.
    ///
    /// Units: millimeters,
    /// Frame: Leg
    pub init_pos: Vec3
}

/// Joint angles of one leg.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JointAngles {
    /// Units: degrees
    pub coxa: f64,

    /// Units: degrees
    pub femur: f64,

    /// Units: degrees
    pub tibia: f64
}

/// The result of solving a leg's inverse kinematics.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct IkSolution {
    pub angles: JointAngles,
    pub status: IkStatus
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Quality of an inverse kinematics solution.
///
/// Targets outside the leg's reach still produce angles (the leg stretched towards the target),
/// the status only reports how close to the edge of the workspace the target was.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IkStatus {
    Solved,
    NearLimit,
    Unreachable
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn norm(&self) -> f64 {
        (self.x.powi(2) + self.y.powi(2) + self.z.powi(2)).sqrt()
    }
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Default for LegDims {
    fn default() -> Self {
        Self {
            coxa_length: 29.0,
            femur_length: 57.0,
            tibia_length: 141.0
        }
    }
}

impl LegDims {
    /// Maximum distance between the femur joint and the foot.
    pub fn max_reach(&self) -> f64 {
        self.femur_length + self.tibia_length
    }
}

impl LegGeometry {
    /// Geometry of the reference hexapod frame.
    ///
    /// Left legs mirror the right ones about the body's longitudinal axis. Since the leg frame's
    /// X axis is mirrored too the mount angles and neutral positions are shared by both sides.
    pub fn default_for(leg: LegId) -> Self {
        let (offset_x, offset_z, mount_angle_deg, init_pos) = match leg {
            LegId::RightRear => (-43.0, 82.0, -60.0, Vec3::new(53.0, 25.0, 91.0)),
            LegId::RightMiddle => (-63.0, 0.0, 0.0, Vec3::new(105.0, 25.0, 0.0)),
            LegId::RightFront => (-43.0, -82.0, 60.0, Vec3::new(53.0, 25.0, -91.0)),
            LegId::LeftRear => (43.0, 82.0, -60.0, Vec3::new(53.0, 25.0, 91.0)),
            LegId::LeftMiddle => (63.0, 0.0, 0.0, Vec3::new(105.0, 25.0, 0.0)),
            LegId::LeftFront => (43.0, -82.0, 60.0, Vec3::new(53.0, 25.0, -91.0)),
        };

        Self {
            leg,
            offset_x,
            offset_z,
            mount_angle_deg,
            init_pos
        }
    }
}
