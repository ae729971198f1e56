//! Leg inverse kinematics

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::f64::consts::{FRAC_PI_2, PI};

use super::{IkSolution, IkStatus, JointAngles, LegDims, LegGeometry, Vec3};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Default distance from the edge of the leg's reach below which solutions are flagged as
/// `IkStatus::NearLimit`.
///
/// Units: millimeters
pub const DEFAULT_NEAR_LIMIT_MARGIN: f64 = 30.0;

/// Band around +/-1 within which `arc_cos` uses the small angle approximation.
const ARC_COS_LINEAR_BAND: f64 = 1e-6;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Solve the joint angles which place the foot of the given leg at `target`.
///
/// `target` is in the leg frame. This never fails: targets the leg cannot reach produce the angles
/// of the leg stretched (or folded) as far as it goes towards the target, and are flagged in the
/// returned status.
pub fn solve(dims: &LegDims, geometry: &LegGeometry, target: Vec3) -> IkSolution {
    solve_with_margin(dims, geometry, target, DEFAULT_NEAR_LIMIT_MARGIN)
}

/// As [`solve`] with an explicit near limit margin.
pub fn solve_with_margin(
    dims: &LegDims,
    geometry: &LegGeometry,
    target: Vec3,
    near_limit_margin: f64
) -> IkSolution {
    let femur = dims.femur_length;
    let tibia = dims.tibia_length;

    // Coxa rotates the leg plane to face the target
    let coxa = target.z.atan2(target.x).to_degrees() + geometry.mount_angle_deg;

    // Remaining problem is planar: horizontal reach beyond the coxa, and height
    let reach_xz = (target.x.powi(2) + target.z.powi(2)).sqrt();
    let reach_h = reach_xz - dims.coxa_length;

    // Distance from the femur joint to the foot
    let sw = (target.y.powi(2) + reach_h.powi(2)).sqrt();

    // Angle of the femur->foot line measured from straight down
    let a1 = reach_h.atan2(target.y);

    // Angle between the femur and the femur->foot line
    let a2 = if sw > 0.0 {
        arc_cos((femur.powi(2) - tibia.powi(2) + sw.powi(2)) / (2.0 * femur * sw))
    }
    else {
        0.0
    };

    let femur_angle = 90.0 - (a1 + a2).to_degrees();

    // Interior angle at the knee
    let knee = arc_cos((femur.powi(2) + tibia.powi(2) - sw.powi(2)) / (2.0 * femur * tibia));
    let tibia_angle = -(90.0 - knee.to_degrees());

    let status = if sw > dims.max_reach() || sw < (tibia - femur).abs() {
        IkStatus::Unreachable
    }
    else if sw >= dims.max_reach() - near_limit_margin {
        IkStatus::NearLimit
    }
    else {
        IkStatus::Solved
    };

    IkSolution {
        angles: JointAngles {
            coxa,
            femur: femur_angle,
            tibia: tibia_angle
        },
        status
    }
}

/// Arc cosine which accepts any input.
///
/// The input is clamped to [-1, 1]. Very close to the ends of the range the small angle
/// approximation `acos(1 - d) = sqrt(2 d)` is used in place of the library function.
pub fn arc_cos(cos: f64) -> f64 {
    let c = cos.max(-1.0).min(1.0);
    let d = 1.0 - c.abs();

    if d < ARC_COS_LINEAR_BAND {
        let angle = (2.0 * d).sqrt();

        if c >= 0.0 {
            angle
        }
        else {
            PI - angle
        }
    }
    else {
        c.acos()
    }
}

/// Angle of the leg plane for a coxa angle, with the mount angle removed.
///
/// Units: radians
pub(crate) fn leg_plane_angle(geometry: &LegGeometry, coxa_deg: f64) -> f64 {
    (coxa_deg - geometry.mount_angle_deg).to_radians()
}

/// Angle of the femur above the leg plane's downward vertical for a femur joint angle.
///
/// Units: radians
pub(crate) fn femur_from_vertical(femur_deg: f64) -> f64 {
    FRAC_PI_2 - femur_deg.to_radians()
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::kinematics::forward;
    use comms_if::eqpt::LegId;

    #[test]
    fn test_arc_cos() {
        assert_eq!(arc_cos(1.5), 0.0);
        assert!((arc_cos(-7.0) - PI).abs() < 1e-12);
        assert!((arc_cos(0.5) - 0.5f64.acos()).abs() < 1e-12);

        // Inside the band the approximation stays continuous with acos
        let c = 1.0 - 0.5e-6;
        assert!((arc_cos(c) - c.acos()).abs() < 1e-6);
        let c = -1.0 + 0.5e-6;
        assert!((arc_cos(c) - c.acos()).abs() < 1e-6);
    }

    #[test]
    fn test_neutral_stance() {
        let dims = LegDims::default();
        let geom = LegGeometry::default_for(LegId::RightMiddle);

        // Neutral foot with the body raised to standing height
        let sol = solve(&dims, &geom, Vec3::new(105.0, 90.0, 0.0));

        assert_eq!(sol.status, IkStatus::Solved);
        assert!(sol.angles.coxa.abs() < 1e-9);
        assert!((sol.angles.femur + 52.0).abs() < 0.5, "femur {}", sol.angles.femur);
        assert!((sol.angles.tibia + 35.2).abs() < 0.5, "tibia {}", sol.angles.tibia);
    }

    #[test]
    fn test_coxa_mount_angle() {
        let dims = LegDims::default();

        // Neutral corner feet point straight along the mount angle
        for leg in [LegId::RightRear, LegId::RightFront, LegId::LeftRear, LegId::LeftFront].iter() {
            let geom = LegGeometry::default_for(*leg);
            let target = Vec3::new(geom.init_pos.x, 90.0, geom.init_pos.z);
            let sol = solve(&dims, &geom, target);
            assert!(sol.angles.coxa.abs() < 0.5, "{:?} coxa {}", leg, sol.angles.coxa);
        }
    }

    #[test]
    fn test_round_trip() {
        let dims = LegDims::default();

        for leg in LegId::ALL.iter() {
            let geom = LegGeometry::default_for(*leg);

            for &(x, y, z) in [
                (105.0, 90.0, 0.0),
                (80.0, 110.0, -40.0),
                (140.0, 60.0, 35.0),
                (60.0, 120.0, 60.0),
                (150.0, 20.0, -20.0)
            ].iter() {
                let target = Vec3::new(x, y, z);
                let sol = solve(&dims, &geom, target);
                assert_ne!(sol.status, IkStatus::Unreachable);

                let foot = forward(&dims, &geom, &sol.angles);
                assert!(
                    (foot - target).norm() < 0.5,
                    "{:?}: target {:?} reconstructed {:?}", leg, target, foot
                );
            }
        }
    }

    #[test]
    fn test_unreachable() {
        let dims = LegDims::default();
        let geom = LegGeometry::default_for(LegId::LeftMiddle);

        // Far beyond reach: the leg is fully stretched
        let sol = solve(&dims, &geom, Vec3::new(400.0, 50.0, 0.0));
        assert_eq!(sol.status, IkStatus::Unreachable);
        assert!((sol.angles.tibia - 90.0).abs() < 1e-6);
        assert!(sol.angles.femur.is_finite());

        // Just inside the reach is flagged as near the limit
        let sol = solve(&dims, &geom, Vec3::new(29.0 + 190.0, 0.0, 0.0));
        assert_eq!(sol.status, IkStatus::NearLimit);

        // Target on the coxa joint itself
        let sol = solve(&dims, &geom, Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(sol.status, IkStatus::Unreachable);
        assert!(sol.angles.coxa.is_finite());
        assert!(sol.angles.femur.is_finite());
        assert!(sol.angles.tibia.is_finite());
    }
}
