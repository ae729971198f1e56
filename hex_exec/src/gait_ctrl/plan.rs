//! Gait plan table

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

use comms_if::{eqpt::{LegId, NUM_LEGS}, tc::GaitType};
use super::GaitPlanError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Constants describing one gait.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaitPlan {
    pub gait_type: GaitType,

    /// Number of steps in one full cycle
    pub steps_in_gait: u32,

    /// Number of consecutive steps each leg spends in the air
    pub lifted_positions: u32,

    /// Step, counted from the leg's phase, at which the foot is put down
    pub front_down_pos: u32,

    /// Trim on the height of the half lift positions, which sit at
    /// `3 * lift / (3 + half_lift_height)`
    pub half_lift_height: f64,

    /// Number of stance steps the travel is spread across
    pub tl_division_factor: f64,

    /// Step duration the gait was tuned for.
    ///
    /// Units: milliseconds
    pub nominal_speed_ms: u32,

    /// Step at which each leg is at the top of its lift, in `LegId::ALL` order
    pub leg_phase: [u32; NUM_LEGS]
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GaitPlan {
    /// The built in plan for a gait type.
    pub fn builtin(gait_type: GaitType) -> Self {
        // (steps, lifted, half lift, tl div, nominal speed, phases)
        let (steps_in_gait, lifted_positions, half_lift_height, tl_division_factor, nominal_speed_ms, leg_phase) =
            match gait_type {
                GaitType::Ripple12 => (12, 3, 3.0, 8.0, 70, [7, 11, 3, 1, 5, 9]),
                GaitType::Tripod8 => (8, 3, 3.0, 4.0, 70, [1, 5, 1, 5, 1, 5]),
                GaitType::TripleTripod12 => (12, 3, 3.0, 8.0, 60, [5, 10, 3, 11, 4, 9]),
                GaitType::TripleTripod16 => (16, 5, 1.0, 10.0, 60, [6, 13, 4, 14, 5, 12]),
                GaitType::Wave24 => (24, 3, 3.0, 20.0, 70, [13, 17, 21, 1, 5, 9]),
                GaitType::Tripod6 => (6, 2, 1.0, 4.0, 150, [1, 4, 1, 4, 1, 4]),
            };

        Self {
            gait_type,
            steps_in_gait,
            lifted_positions,
            front_down_pos: (lifted_positions + 1) / 2,
            half_lift_height,
            tl_division_factor,
            nominal_speed_ms,
            leg_phase
        }
    }

    /// Phase of the given leg.
    pub fn phase(&self, leg: LegId) -> u32 {
        self.leg_phase[leg.index()]
    }

    /// Divisor applied to the travel vector at the half lift positions.
    pub fn lift_division_factor(&self) -> f64 {
        if self.lifted_positions == 5 {
            4.0
        }
        else {
            2.0
        }
    }

    /// Height of the half lift positions for the given full lift height.
    pub fn half_lift(&self, lift_height: f64) -> f64 {
        3.0 * lift_height / (3.0 + self.half_lift_height)
    }

    /// Check the plan is one the gait state machine can execute.
    pub fn validate(&self) -> Result<(), GaitPlanError> {
        if self.steps_in_gait < 2 {
            return Err(GaitPlanError::TooFewSteps(self.gait_type, self.steps_in_gait))
        }

        if self.lifted_positions == 0
            || self.lifted_positions > 5
            || self.lifted_positions >= self.steps_in_gait
        {
            return Err(GaitPlanError::InvalidLiftedPositions(
                self.gait_type, self.lifted_positions
            ))
        }

        if self.tl_division_factor <= 0.0 || self.half_lift_height <= -3.0 {
            return Err(GaitPlanError::InvalidDivisor(self.gait_type))
        }

        for leg in LegId::ALL.iter() {
            let phase = self.phase(*leg);
            if phase == 0 || phase > self.steps_in_gait {
                return Err(GaitPlanError::InvalidPhase(
                    self.gait_type, *leg, phase, self.steps_in_gait
                ))
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
