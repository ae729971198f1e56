//! Gait state machine

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use serde::Serialize;

use comms_if::eqpt::{LegId, NUM_LEGS};
use super::{GaitInput, GaitOffset, GaitPlan};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Offset below which a leg is considered to be back at its neutral position when no travel is
/// requested.
///
/// Units: millimeters (degrees for rotation)
pub const SETTLED_THRESHOLD: f64 = 2.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gait control state, shared by all legs.
#[derive(Debug, Clone, Serialize)]
pub struct GaitCtrl {
    plan: GaitPlan,

    /// Current step in the cycle, from 1 to `plan.steps_in_gait`
    step: u32,

    /// Current offset of each leg, in `LegId::ALL` order
    offsets: [GaitOffset; NUM_LEGS]
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GaitCtrl {
    pub fn new(plan: GaitPlan) -> Self {
        Self {
            plan,
            step: 1,
            offsets: [GaitOffset::default(); NUM_LEGS]
        }
    }

    pub fn plan(&self) -> &GaitPlan {
        &self.plan
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn offset(&self, leg: LegId) -> GaitOffset {
        self.offsets[leg.index()]
    }

    pub fn offsets(&self) -> &[GaitOffset; NUM_LEGS] {
        &self.offsets
    }

    pub fn is_airborne(&self, leg: LegId) -> bool {
        self.offset(leg).is_airborne()
    }

    pub fn num_airborne(&self) -> usize {
        self.offsets.iter().filter(|o| o.is_airborne()).count()
    }

    /// Switch to a new plan.
    ///
    /// Leg offsets and the step counter carry over so legs part way through a lift finish it
    /// under the new plan. A counter past the end of the new cycle restarts at 1.
    pub fn select(&mut self, plan: GaitPlan) {
        if plan == self.plan {
            return
        }

        debug!("Gait changed from {:?} to {:?}", self.plan.gait_type, plan.gait_type);

        self.plan = plan;
        if self.step > self.plan.steps_in_gait {
            self.step = 1;
        }
    }

    /// Put all legs back in their neutral position and restart the cycle.
    pub fn reset(&mut self) {
        self.step = 1;
        self.offsets = [GaitOffset::default(); NUM_LEGS];
    }

    /// Compute the offset of one leg for this step.
    ///
    /// Must be called for each leg in `LegId::ALL` order, advancing the last leg moves the cycle
    /// on to the next step.
    pub fn advance(&mut self, leg: LegId, input: &GaitInput) -> GaitOffset {
        let plan = &self.plan;
        let current = self.offsets[leg.index()];
        let travel = input.travel;
        let moving = input.travel_requested;
        let lifted = plan.lifted_positions;
        let lift_div = plan.lift_division_factor();
        let tl_div = plan.tl_division_factor;

        let step = self.step as i64;
        let phase = plan.phase(leg) as i64;
        let steps = plan.steps_in_gait as i64;

        // True if this step is `offset` steps after the leg's phase, wrapping around the cycle
        let at = |offset: i64| (step - phase - offset).rem_euclid(steps) == 0;

        let settled = current.x.abs() <= SETTLED_THRESHOLD
            && current.z.abs() <= SETTLED_THRESHOLD
            && current.rot_y.abs() <= SETTLED_THRESHOLD;

        let next = if (moving && lifted % 2 == 1 && at(0)) || (!moving && at(0) && !settled) {
            // Top of the lift, also used to return to neutral when travel stops
            GaitOffset {
                x: 0.0,
                y: -input.lift_height,
                z: 0.0,
                rot_y: 0.0
            }
        }
        else if moving && ((lifted == 2 && at(0)) || (lifted >= 3 && at(-1))) {
            // Rear half lift
            GaitOffset {
                x: -travel.x / lift_div,
                y: -plan.half_lift(input.lift_height),
                z: -travel.z / lift_div,
                rot_y: -travel.rot_y / lift_div
            }
        }
        else if moving && lifted >= 2 && at(1) {
            // Front half lift
            GaitOffset {
                x: travel.x / lift_div,
                y: -plan.half_lift(input.lift_height),
                z: travel.z / lift_div,
                rot_y: travel.rot_y / lift_div
            }
        }
        else if moving && lifted == 5 && at(-2) {
            GaitOffset {
                x: -travel.x / 2.0,
                y: -input.lift_height / 2.0,
                z: -travel.z / 2.0,
                rot_y: -travel.rot_y / 2.0
            }
        }
        else if moving && lifted == 5 && at(2) {
            GaitOffset {
                x: travel.x / 2.0,
                y: -input.lift_height / 2.0,
                z: travel.z / 2.0,
                rot_y: travel.rot_y / 2.0
            }
        }
        else if at(plan.front_down_pos as i64) && current.y < 0.0 {
            // Touch down ahead of the neutral position
            GaitOffset {
                x: travel.x / 2.0,
                y: 0.0,
                z: travel.z / 2.0,
                rot_y: travel.rot_y / 2.0
            }
        }
        else {
            // Stance, the planted foot moves back relative to the body
            GaitOffset {
                x: current.x - travel.x / tl_div,
                y: 0.0,
                z: current.z - travel.z / tl_div,
                rot_y: current.rot_y - travel.rot_y / tl_div
            }
        };

        self.offsets[leg.index()] = next;

        if leg == LegId::LeftFront {
            self.step += 1;
            if self.step > self.plan.steps_in_gait {
                self.step = 1;
            }
        }

        next
    }

    /// Advance every leg by one step.
    pub fn advance_all(&mut self, input: &GaitInput) -> [GaitOffset; NUM_LEGS] {
        let mut out = [GaitOffset::default(); NUM_LEGS];

        for leg in LegId::ALL.iter() {
            out[leg.index()] = self.advance(*leg, input);
        }

        out
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::gait_ctrl::TravelVector;
    use comms_if::tc::GaitType;

    const LIFT: f64 = 50.0;

    fn walking(x: f64, z: f64, rot_y: f64) -> GaitInput {
        GaitInput {
            travel: TravelVector { x, z, rot_y },
            travel_requested: true,
            lift_height: LIFT
        }
    }

    fn still() -> GaitInput {
        GaitInput {
            travel: TravelVector::default(),
            travel_requested: false,
            lift_height: LIFT
        }
    }

    #[test]
    fn test_tripod_cycle() {
        let plan = GaitPlan::builtin(GaitType::Tripod8);
        let mut gait = GaitCtrl::new(plan);
        let input = walking(0.0, -50.0, 0.0);

        let mut prev = *gait.offsets();
        let mut lifts = [0u32; NUM_LEGS];
        let mut stance_dz = [0f64; NUM_LEGS];

        for _ in 0..plan.steps_in_gait {
            let offsets = gait.advance_all(&input);

            for leg in LegId::ALL.iter() {
                let i = leg.index();
                if offsets[i].y == -LIFT {
                    lifts[i] += 1;
                }
                if offsets[i].y == 0.0 && prev[i].y == 0.0 {
                    stance_dz[i] += offsets[i].z - prev[i].z;
                }
            }

            // Legs sharing a phase move together, and the tripod is either all up or all down
            let airborne: Vec<bool> = LegId::ALL.iter().map(|l| gait.is_airborne(*l)).collect();
            assert_eq!(airborne[0], airborne[2]);
            assert_eq!(airborne[0], airborne[4]);
            assert_eq!(airborne[1], airborne[3]);
            assert_eq!(airborne[1], airborne[5]);
            assert!(gait.num_airborne() == 0 || gait.num_airborne() == 3);

            prev = offsets;
        }

        assert_eq!(gait.step(), 1);
        for i in 0..NUM_LEGS {
            assert_eq!(lifts[i], 1, "leg {} lifted {} times", i, lifts[i]);

            // Planted feet push the body the full travel distance
            assert!((-stance_dz[i] - -50.0).abs() < 1e-9, "leg {} moved {}", i, stance_dz[i]);
        }

        // Half lift positions straddle the neutral point by the full travel
        let mut gait = GaitCtrl::new(plan);
        gait.advance_all(&input);
        let front = gait.advance_all(&input)[LegId::RightRear.index()];
        assert_eq!(front.y, -25.0);
        assert_eq!(front.z, -25.0);
    }

    #[test]
    fn test_all_gaits_closed() {
        for gait_type in GaitType::ALL.iter() {
            let plan = GaitPlan::builtin(*gait_type);
            let mut gait = GaitCtrl::new(plan);
            let input = walking(10.0, -40.0, 6.0);

            // Warm up for one cycle so every leg is on its steady trajectory
            let mut history = Vec::new();
            for _ in 0..(3 * plan.steps_in_gait) {
                history.push(gait.advance_all(&input));
            }

            let n = plan.steps_in_gait as usize;
            for leg in LegId::ALL.iter() {
                let i = leg.index();

                let airborne = history[n..2 * n].iter().filter(|o| o[i].y < 0.0).count();
                assert_eq!(
                    airborne, plan.lifted_positions as usize,
                    "{:?} leg {:?}", gait_type, leg
                );

                for t in n..2 * n {
                    let a = history[t][i];
                    let b = history[t + n][i];
                    assert!((a.x - b.x).abs() < 1e-9, "{:?} {:?} x drifts", gait_type, leg);
                    assert!((a.z - b.z).abs() < 1e-9, "{:?} {:?} z drifts", gait_type, leg);
                    assert!((a.rot_y - b.rot_y).abs() < 1e-9);
                    assert_eq!(a.y, b.y);
                }
            }
        }
    }

    #[test]
    fn test_still_is_idempotent() {
        let mut gait = GaitCtrl::new(GaitPlan::builtin(GaitType::Ripple12));

        for _ in 0..30 {
            let offsets = gait.advance_all(&still());
            for o in offsets.iter() {
                assert_eq!(*o, GaitOffset::default());
            }
        }
    }

    #[test]
    fn test_settle_after_walking() {
        let plan = GaitPlan::builtin(GaitType::Wave24);
        let mut gait = GaitCtrl::new(plan);

        for _ in 0..37 {
            gait.advance_all(&walking(0.0, -80.0, 10.0));
        }

        // Legs return to neutral one phase group at a time
        let mut max_airborne = 0;
        for _ in 0..(2 * plan.steps_in_gait) {
            gait.advance_all(&still());
            max_airborne = max_airborne.max(gait.num_airborne());
        }
        assert!(max_airborne <= 2);

        for o in gait.offsets().iter() {
            assert!(o.x.abs() <= SETTLED_THRESHOLD);
            assert!(o.z.abs() <= SETTLED_THRESHOLD);
            assert!(o.rot_y.abs() <= SETTLED_THRESHOLD);
            assert_eq!(o.y, 0.0);
        }
    }

    #[test]
    fn test_select_and_reset() {
        let mut gait = GaitCtrl::new(GaitPlan::builtin(GaitType::Wave24));

        for _ in 0..20 {
            gait.advance_all(&walking(0.0, -50.0, 0.0));
        }
        assert_eq!(gait.step(), 21);
        let offsets = *gait.offsets();

        // Counter past the end of the new cycle restarts, offsets carry over
        gait.select(GaitPlan::builtin(GaitType::Tripod8));
        assert_eq!(gait.step(), 1);
        assert_eq!(*gait.offsets(), offsets);
        assert_eq!(gait.plan().gait_type, GaitType::Tripod8);

        gait.advance_all(&walking(0.0, -50.0, 0.0));
        gait.select(GaitPlan::builtin(GaitType::Ripple12));
        assert_eq!(gait.step(), 2);

        gait.reset();
        assert_eq!(gait.step(), 1);
        assert_eq!(gait.num_airborne(), 0);
        assert!(gait.offsets().iter().all(|o| *o == GaitOffset::default()));
    }
}
