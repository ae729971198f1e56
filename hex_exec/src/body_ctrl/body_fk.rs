//! Body forward kinematics

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::LegSide;

use super::{BodyPose, RotationOffset};
use crate::gait_ctrl::GaitOffset;
use crate::kinematics::{LegGeometry, Vec3};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Displacement of a foot caused by rotating the body.
///
/// `foot` is the foot relative to the leg's coxa joint, expressed along the body axes (X positive
/// to the left for both sides). The rotation combines the body pose with the gait's own yaw
/// offset for the leg.
///
/// Returns `cpr - R * cpr` where `cpr` is the foot relative to the centre of rotation.
pub fn body_fk(
    geometry: &LegGeometry,
    foot: Vec3,
    pose: &BodyPose,
    gait_rot_y: f64,
    rot_offset: &RotationOffset
) -> Vec3 {
    let cpr = Vec3 {
        x: geometry.offset_x + foot.x,
        y: foot.y + rot_offset.y,
        z: geometry.offset_z + foot.z + rot_offset.z
    };

    cpr - rotate(cpr, pose, gait_rot_y)
}

/// Rotate a point about the centre of rotation by the body pose and additional yaw.
pub fn rotate(point: Vec3, pose: &BodyPose, extra_rot_y: f64) -> Vec3 {
    let (s_g, c_g) = pose.rot_x.to_radians().sin_cos();
    let (s_b, c_b) = pose.rot_z.to_radians().sin_cos();
    let (s_a, c_a) = (pose.rot_y + extra_rot_y).to_radians().sin_cos();

    let Vec3 { x, y, z } = point;

    Vec3 {
        x: x * c_a * c_b - z * c_b * s_a + y * s_b,
        y: x * s_a * s_g - x * c_a * c_g * s_b + z * c_a * s_g + z * c_g * s_a * s_b
            + y * c_b * c_g,
        z: x * c_g * s_a + x * c_a * s_b * s_g + z * c_a * c_g - z * s_a * s_b * s_g
            - y * c_b * s_g
    }
}

/// Compute the leg frame target for a leg given its nominal foot position, gait offset and the
/// body pose.
///
/// The leg frame's X axis points outwards from the body, so the body pose and gait's lateral
/// components are mirrored for right side legs.
pub fn apply(
    geometry: &LegGeometry,
    nominal: Vec3,
    gait: &GaitOffset,
    pose: &BodyPose,
    rot_offset: &RotationOffset
) -> Vec3 {
    let side = geometry.leg.side();

    let foot_x = match side {
        LegSide::Right => -nominal.x + pose.pos_x + gait.x,
        LegSide::Left => nominal.x + pose.pos_x + gait.x
    };
    let foot = Vec3 {
        x: foot_x,
        y: nominal.y + pose.pos_y + gait.y,
        z: nominal.z + pose.pos_z + gait.z
    };

    let fk = body_fk(geometry, foot, pose, gait.rot_y, rot_offset);

    let x = match side {
        LegSide::Right => nominal.x - pose.pos_x + fk.x - gait.x,
        LegSide::Left => nominal.x + pose.pos_x - fk.x + gait.x
    };

    Vec3 {
        x,
        y: nominal.y + pose.pos_y - fk.y + gait.y,
        z: nominal.z + pose.pos_z - fk.z + gait.z
    }
}

/// Express a leg frame position relative to the body centre, along the body axes.
pub fn leg_to_body(geometry: &LegGeometry, pos: Vec3) -> Vec3 {
    let x = match geometry.leg.side() {
        LegSide::Right => geometry.offset_x - pos.x,
        LegSide::Left => geometry.offset_x + pos.x
    };

    Vec3 {
        x,
        y: pos.y,
        z: geometry.offset_z + pos.z
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
