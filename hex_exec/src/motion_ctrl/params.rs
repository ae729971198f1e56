//! Parameters structure for MotionCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Serialize, Deserialize};
use std::time::Duration;

use comms_if::{eqpt::{LegId, NUM_LEGS}, tc::GaitType};
use util::maths::clamp;
use crate::{
    body_ctrl::RotationOffset,
    gait_ctrl::GaitPlan,
    kinematics::{JointAngles, LegDims, LegGeometry, DEFAULT_NEAR_LIMIT_MARGIN}
};
use super::MotionCtrlError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Motion control.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {

    // ---- GEOMETRY ----

    /// Link lengths shared by all legs
    pub dims: LegDims,

    /// Geometry of each leg, exactly one entry per leg
    pub legs: Vec<LegGeometry>,

    /// Mechanical limits of the joints, applied before angles are sent to the servos
    pub limits: JointLimits,

    /// Offset of the body's centre of rotation in height.
    ///
    /// Units: millimeters
    pub rot_offset_y: f64,

    /// Offset of the body's centre of rotation towards the rear.
    ///
    /// Units: millimeters
    pub rot_offset_z: f64,

    // ---- GAIT ----

    /// Travel components at or below this magnitude are treated as zero.
    ///
    /// Units: millimeters (degrees for rotation)
    pub travel_dead_zone: f64,

    /// Distance from the edge of the leg's reach at which IK solutions are reported as near the
    /// limit.
    ///
    /// Units: millimeters
    pub ik_near_limit_margin: f64,

    /// Replacements for the built in gait plans
    pub gait_plans: Vec<GaitPlan>,

    // ---- SERVO MAPPING ----

    /// Divisor in the angle to pulse width mapping
    pub pwm_div: f64,

    /// Offset in the angle to pulse width mapping.
    ///
    /// Units: microseconds
    pub pwm_offset: f64,

    // ---- TIMING ----

    /// Time allowed beyond a frame's duration for the servos to acknowledge it.
    ///
    /// Units: milliseconds
    pub ack_margin_ms: u64,

    /// Period of the control loop while movement is disabled.
    ///
    /// Units: milliseconds
    pub idle_period_ms: u64,

    /// Time the legs are given to settle before the servos are released.
    ///
    /// Units: milliseconds
    pub settle_delay_ms: u64,

    // ---- ARCHIVING ----

    /// Archive every emitted frame to the session
    pub archive: bool
}

/// Range of travel of a single joint.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointRange {
    /// Units: degrees
    pub min: f64,

    /// Units: degrees
    pub max: f64
}

/// Ranges of travel of a leg's joints, shared by all legs.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointLimits {
    pub coxa: JointRange,
    pub femur: JointRange,
    pub tibia: JointRange
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            dims: LegDims::default(),
            legs: LegId::ALL.iter().map(|l| LegGeometry::default_for(*l)).collect(),
            limits: JointLimits::default(),
            rot_offset_y: 0.0,
            rot_offset_z: 0.0,
            travel_dead_zone: 1.0,
            ik_near_limit_margin: DEFAULT_NEAR_LIMIT_MARGIN,
            gait_plans: Vec::new(),
            pwm_div: 991.0,
            pwm_offset: 592.0,
            ack_margin_ms: 100,
            idle_period_ms: 100,
            settle_delay_ms: 600,
            archive: false
        }
    }
}

impl Params {
    /// Get the plan for a gait, preferring any replacement given in the parameters.
    pub fn gait_plan(&self, gait_type: GaitType) -> GaitPlan {
        self.gait_plans.iter()
            .find(|p| p.gait_type == gait_type)
            .copied()
            .unwrap_or_else(|| GaitPlan::builtin(gait_type))
    }

    pub fn rot_offset(&self) -> RotationOffset {
        RotationOffset {
            y: self.rot_offset_y,
            z: self.rot_offset_z
        }
    }

    pub fn idle_period(&self) -> Duration {
        Duration::from_millis(self.idle_period_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Arrange the leg geometry in `LegId::ALL` order, checking every leg appears exactly once.
    pub fn leg_geometry(&self) -> Result<[LegGeometry; NUM_LEGS], MotionCtrlError> {
        let mut ordered: [Option<LegGeometry>; NUM_LEGS] = [None; NUM_LEGS];

        for geom in self.legs.iter() {
            let slot = &mut ordered[geom.leg.index()];
            if slot.is_some() {
                return Err(MotionCtrlError::InvalidGeometry(
                    format!("leg {} is given more than once", geom.leg)
                ))
            }
            *slot = Some(*geom);
        }

        let mut out = [LegGeometry::default_for(LegId::RightRear); NUM_LEGS];
        for leg in LegId::ALL.iter() {
            out[leg.index()] = ordered[leg.index()].ok_or_else(|| MotionCtrlError::InvalidGeometry(
                format!("leg {} is missing", leg)
            ))?;
        }

        Ok(out)
    }

    /// Check the parameters are usable.
    pub fn validate(&self) -> Result<(), MotionCtrlError> {
        self.leg_geometry()?;
        self.limits.validate()?;

        if self.dims.femur_length <= 0.0 || self.dims.tibia_length <= 0.0 {
            return Err(MotionCtrlError::InvalidGeometry(
                "femur and tibia lengths must be positive".into()
            ))
        }

        if self.pwm_div <= 0.0 {
            return Err(MotionCtrlError::InvalidServoMapping(self.pwm_div))
        }

        for plan in self.gait_plans.iter() {
            plan.validate().map_err(MotionCtrlError::InvalidGaitPlan)?;
        }

        Ok(())
    }
}

impl Default for JointLimits {
    fn default() -> Self {
        Self {
            coxa: JointRange { min: -65.0, max: 65.0 },
            femur: JointRange { min: -105.0, max: 75.0 },
            tibia: JointRange { min: -53.0, max: 90.0 }
        }
    }
}

impl JointLimits {
    /// Limit the angles to the joint ranges.
    ///
    /// Returns the limited angles and a flag for each of coxa, femur and tibia which is `true` if
    /// that joint had to be limited.
    pub fn clamp(&self, angles: &JointAngles) -> (JointAngles, [bool; 3]) {
        let (coxa, coxa_lim) = clamp(angles.coxa, self.coxa.min, self.coxa.max);
        let (femur, femur_lim) = clamp(angles.femur, self.femur.min, self.femur.max);
        let (tibia, tibia_lim) = clamp(angles.tibia, self.tibia.min, self.tibia.max);

        (
            JointAngles { coxa, femur, tibia },
            [coxa_lim, femur_lim, tibia_lim]
        )
    }

    fn validate(&self) -> Result<(), MotionCtrlError> {
        for (name, range) in [("coxa", self.coxa), ("femur", self.femur), ("tibia", self.tibia)].iter() {
            if !(range.min < range.max) {
                return Err(MotionCtrlError::InvalidJointLimits(
                    format!("{} minimum {} is not below maximum {}", name, range.min, range.max)
                ))
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_params_valid() {
        let params = Params::default();
        params.validate().unwrap();

        let geom = params.leg_geometry().unwrap();
        for leg in LegId::ALL.iter() {
            assert_eq!(geom[leg.index()].leg, *leg);
        }
    }

    #[test]
    fn test_params_from_toml() {
        let params: Params = util::params::from_str(r#"
            travel_dead_zone = 2.5
            settle_delay_ms = 250

            [limits]
            coxa = { min = -50.0, max = 50.0 }
            femur = { min = -90.0, max = 90.0 }
            tibia = { min = -45.0, max = 80.0 }

            [[gait_plans]]
            gait_type = "Tripod8"
            steps_in_gait = 8
            lifted_positions = 3
            front_down_pos = 2
            half_lift_height = 2.0
            tl_division_factor = 4.0
            nominal_speed_ms = 50
            leg_phase = [1, 5, 1, 5, 1, 5]
        "#).unwrap();

        params.validate().unwrap();
        assert_eq!(params.travel_dead_zone, 2.5);
        assert_eq!(params.settle_delay(), Duration::from_millis(250));
        assert_eq!(params.limits.coxa.max, 50.0);
        assert_eq!(params.gait_plan(GaitType::Tripod8).half_lift_height, 2.0);
        assert_eq!(params.gait_plan(GaitType::Wave24), GaitPlan::builtin(GaitType::Wave24));

        // Unspecified values keep their defaults
        assert_eq!(params.pwm_div, 991.0);
        assert_eq!(params.legs.len(), NUM_LEGS);
    }

    #[test]
    fn test_invalid_geometry() {
        let mut params = Params::default();
        params.legs[3].leg = LegId::RightRear;
        assert!(matches!(params.validate(), Err(MotionCtrlError::InvalidGeometry(_))));

        let mut params = Params::default();
        params.legs.pop();
        assert!(matches!(params.validate(), Err(MotionCtrlError::InvalidGeometry(_))));

        let mut params = Params::default();
        params.limits.femur = JointRange { min: 10.0, max: -10.0 };
        assert!(matches!(params.validate(), Err(MotionCtrlError::InvalidJointLimits(_))));
    }

    #[test]
    fn test_joint_clamp() {
        let limits = JointLimits::default();

        let (a, flags) = limits.clamp(&JointAngles { coxa: 10.0, femur: -20.0, tibia: 30.0 });
        assert_eq!(a, JointAngles { coxa: 10.0, femur: -20.0, tibia: 30.0 });
        assert_eq!(flags, [false, false, false]);

        let (a, flags) = limits.clamp(&JointAngles { coxa: 100.0, femur: -200.0, tibia: 30.0 });
        assert_eq!(a.coxa, 65.0);
        assert_eq!(a.femur, -105.0);
        assert_eq!(flags, [true, true, false]);
    }
}
