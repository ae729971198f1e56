//! Leg forward kinematics

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::f64::consts::PI;

use super::{JointAngles, LegDims, LegGeometry, Vec3};
use super::leg_ik::{femur_from_vertical, leg_plane_angle};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute the foot position in the leg frame for the given joint angles.
///
/// Inverse of [`super::solve`] for reachable targets.
pub fn forward(dims: &LegDims, geometry: &LegGeometry, angles: &JointAngles) -> Vec3 {
    // Femur direction, measured from straight down towards the outside of the leg plane
    let theta = femur_from_vertical(angles.femur);
    let knee_h = dims.femur_length * theta.sin();
    let knee_y = dims.femur_length * theta.cos();

    // Tibia direction, the interior knee angle is turned from the knee->hip line
    let knee_interior = (90.0 + angles.tibia).to_radians();
    let phi = theta + PI + knee_interior;
    let foot_h = knee_h + dims.tibia_length * phi.sin();
    let foot_y = knee_y + dims.tibia_length * phi.cos();

    // Back out of the leg plane
    let reach_xz = foot_h + dims.coxa_length;
    let psi = leg_plane_angle(geometry, angles.coxa);

    Vec3 {
        x: reach_xz * psi.cos(),
        y: foot_y,
        z: reach_xz * psi.sin()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
