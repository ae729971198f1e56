//! Implementations for the MotionCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info, trace};
use serde::Serialize;
use std::time::Duration;

use comms_if::{
    eqpt::{LegId, ServoFrame, NUM_LEGS, NUM_SERVO_CHANNELS},
    tc::GaitType
};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    params,
    session::{self, Session}
};
use crate::{
    body_ctrl,
    gait_ctrl::{GaitCtrl, GaitInput, TravelVector},
    kinematics::{self, IkStatus, JointAngles, LegGeometry},
    request::MotionRequest
};
use super::{
    build_frame, ChannelMap, ControlAction, Mode, MotionCtrlError, Params, DEFAULT_CHANNELS
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Motion control module state
pub struct MotionCtrl {
    params: Params,

    /// Leg geometry in `LegId::ALL` order
    geometry: [LegGeometry; NUM_LEGS],

    /// Servo channels in frame order
    channels: [u8; NUM_SERVO_CHANNELS],

    mode: Mode,
    gait: GaitCtrl,

    /// Joint angles of the last frame sent, in `LegId::ALL` order
    angles: [JointAngles; NUM_LEGS],

    report: StatusReport,

    last_record: Option<FrameRecord>,
    arch_frames: Archiver
}

/// Files needed to initialise MotionCtrl, relative to the parameters directory.
#[derive(Debug, Clone, Copy)]
pub struct InitData {
    pub params_file: &'static str,
    pub channels_file: &'static str
}

/// Status report for MotionCtrl processing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatusReport {
    pub mode: Mode,

    /// Gait step the frame was computed for
    pub gait_step: u32,

    /// Whether the travel vector was outside the dead zone
    pub travel_requested: bool,

    /// Quality of each leg's inverse kinematics solution
    pub ik_status: [IkStatus; NUM_LEGS],

    /// Coxa, femur and tibia limit flags for each leg
    pub joint_clamped: [[bool; 3]; NUM_LEGS]
}

/// Archived summary of an emitted frame.
#[derive(Debug, Clone, Serialize)]
struct FrameRecord {
    time_s: f64,
    mode: Mode,
    gait_type: GaitType,
    gait_step: u32,
    travel_x: f64,
    travel_z: f64,
    travel_rot_y: f64,
    duration_ms: Option<u32>,
    num_clamped: usize,
    num_not_solved: usize,
    positions: String
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for StatusReport {
    fn default() -> Self {
        Self {
            mode: Mode::Idle,
            gait_step: 1,
            travel_requested: false,
            ik_status: [IkStatus::Solved; NUM_LEGS],
            joint_clamped: [[false; 3]; NUM_LEGS]
        }
    }
}

impl StatusReport {
    pub fn num_clamped(&self) -> usize {
        self.joint_clamped.iter().flatten().filter(|c| **c).count()
    }

    pub fn num_not_solved(&self) -> usize {
        self.ik_status.iter().filter(|s| **s != IkStatus::Solved).count()
    }
}

impl Default for MotionCtrl {
    fn default() -> Self {
        let params = Params::default();
        let mut geometry = [LegGeometry::default_for(LegId::RightRear); NUM_LEGS];
        for leg in LegId::ALL.iter() {
            geometry[leg.index()] = LegGeometry::default_for(*leg);
        }

        Self::from_parts(params, geometry, DEFAULT_CHANNELS)
    }
}

impl State for MotionCtrl {
    type InitData = InitData;
    type InitError = MotionCtrlError;

    type InputData = MotionRequest;
    type OutputData = ControlAction;
    type StatusReport = StatusReport;
    type ProcError = MotionCtrlError;

    /// Initialise the MotionCtrl module.
    ///
    /// Both the parameters and the channel map must load and validate, motion is not possible
    /// without them.
    fn init(&mut self, init_data: Self::InitData, session: &Session) -> Result<(), Self::InitError> {
        let params: Params = params::load(init_data.params_file)
            .map_err(MotionCtrlError::ParamLoadError)?;
        let channel_map: ChannelMap = params::load(init_data.channels_file)
            .map_err(MotionCtrlError::ChannelMapLoadError)?;

        *self = Self::new(params, channel_map)?;

        if self.params.archive {
            self.arch_frames = Archiver::from_path(session, "motion_ctrl/frames.csv")
                .map_err(MotionCtrlError::ArchiveError)?;
        }

        session.save("motion_ctrl/params.json", self.params.clone());

        info!("MotionCtrl initialised");

        Ok(())
    }

    /// Perform one tick of motion control.
    ///
    /// Never fails on numeric grounds: unreachable targets and joint limits are reported in the
    /// status report.
    fn proc(&mut self, request: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        // The release was handed out on the previous tick
        if self.mode == Mode::ShuttingDown {
            self.mode = Mode::Idle;
            info!("Servos released, MotionCtrl idle");
        }

        self.report = StatusReport {
            mode: self.mode,
            gait_step: self.gait.step(),
            ..StatusReport::default()
        };

        self.gait.select(self.params.gait_plan(request.gait_type));

        let action = match (self.mode, request.enabled) {
            (Mode::Active, true) => ControlAction::Move(self.active_tick(request)),
            (Mode::Active, false) => {
                info!("Movement disabled, releasing servos");
                self.mode = Mode::ShuttingDown;

                let frame = ServoFrame::release(&self.channels);
                self.record(request, &frame);

                ControlAction::Release {
                    settle: self.params.settle_delay(),
                    frame
                }
            },
            (_, true) => {
                info!("Movement enabled with {} gait", request.gait_type);
                self.gait.reset();
                self.mode = Mode::Active;
                ControlAction::Move(self.active_tick(request))
            },
            (_, false) => ControlAction::Wait(self.params.idle_period())
        };

        self.report.mode = self.mode;

        Ok((action, self.report))
    }
}

impl Archived for MotionCtrl {
    fn write(&mut self) -> Result<(), ArchiveError> {
        match self.last_record.take() {
            Some(r) if self.arch_frames.is_open() => self.arch_frames.serialise(r),
            _ => Ok(())
        }
    }
}

impl MotionCtrl {
    /// Build motion control from already loaded parameters.
    pub fn new(params: Params, channel_map: ChannelMap) -> Result<Self, MotionCtrlError> {
        params.validate()?;
        let geometry = params.leg_geometry()?;
        let channels = channel_map.channels()?;

        Ok(Self::from_parts(params, geometry, channels))
    }

    fn from_parts(
        params: Params,
        geometry: [LegGeometry; NUM_LEGS],
        channels: [u8; NUM_SERVO_CHANNELS]
    ) -> Self {
        let gait = GaitCtrl::new(params.gait_plan(GaitType::default()));

        Self {
            params,
            geometry,
            channels,
            mode: Mode::Idle,
            gait,
            angles: [JointAngles::default(); NUM_LEGS],
            report: StatusReport::default(),
            last_record: None,
            arch_frames: Archiver::default()
        }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn gait(&self) -> &GaitCtrl {
        &self.gait
    }

    pub fn channels(&self) -> &[u8; NUM_SERVO_CHANNELS] {
        &self.channels
    }

    /// Joint angles of the last movement frame.
    pub fn joint_angles(&self) -> &[JointAngles; NUM_LEGS] {
        &self.angles
    }

    pub fn report(&self) -> &StatusReport {
        &self.report
    }

    /// Time to wait for a frame to be applied before giving up on it.
    pub fn ack_timeout(&self, frame: &ServoFrame) -> Duration {
        Duration::from_millis(frame.duration_ms.unwrap_or(0) as u64 + self.params.ack_margin_ms)
    }

    /// Compute the frame for one tick while moving.
    fn active_tick(&mut self, request: &MotionRequest) -> ServoFrame {
        let travel_requested = request.travel.exceeds(self.params.travel_dead_zone);
        let input = GaitInput {
            travel: match travel_requested {
                true => request.travel,
                false => TravelVector::default()
            },
            travel_requested,
            lift_height: request.leg_lift_height
        };
        let rot_offset = self.params.rot_offset();

        for leg in LegId::ALL.iter() {
            let i = leg.index();
            let geom = &self.geometry[i];

            let gait = self.gait.advance(*leg, &input);

            let mut nominal = geom.init_pos;
            nominal.y += request.leg_y_offset[i];

            let target = body_ctrl::apply(geom, nominal, &gait, &request.body, &rot_offset);
            let solution = kinematics::solve_with_margin(
                &self.params.dims,
                geom,
                target,
                self.params.ik_near_limit_margin
            );
            let (angles, clamped) = self.params.limits.clamp(&solution.angles);

            if solution.status == IkStatus::Unreachable {
                debug!("Leg {} target {:?} is out of reach", leg, target);
            }

            self.report.ik_status[i] = solution.status;
            self.report.joint_clamped[i] = clamped;
            self.angles[i] = angles;
        }

        self.report.travel_requested = travel_requested;

        let frame = build_frame(
            &self.channels,
            &self.angles,
            request.gait_speed_ms,
            self.params.pwm_div,
            self.params.pwm_offset
        );

        trace!("MotionCtrl frame: {}", frame.to_ssc_command().trim_end());

        self.record(request, &frame);

        frame
    }

    fn record(&mut self, request: &MotionRequest, frame: &ServoFrame) {
        if !self.arch_frames.is_open() {
            return
        }

        let positions = frame.positions.iter()
            .map(|p| p.position.to_string())
            .collect::<Vec<_>>()
            .join(" ");

        self.last_record = Some(FrameRecord {
            time_s: session::get_elapsed_seconds(),
            mode: self.mode,
            gait_type: request.gait_type,
            gait_step: self.report.gait_step,
            travel_x: request.travel.x,
            travel_z: request.travel.z,
            travel_rot_y: request.travel.rot_y,
            duration_ms: frame.duration_ms,
            num_clamped: self.report.num_clamped(),
            num_not_solved: self.report.num_not_solved(),
            positions
        });
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::eqpt::SERVO_OFF_POSITION;
    use crate::motion_ctrl::JointLimits;

    fn enabled() -> MotionRequest {
        MotionRequest {
            enabled: true,
            ..MotionRequest::default()
        }
    }

    fn frame_of(action: ControlAction) -> ServoFrame {
        match action {
            ControlAction::Move(f) => f,
            a => panic!("Expected a move, got {:?}", a)
        }
    }

    #[test]
    fn test_idle_waits() {
        let mut ctrl = MotionCtrl::default();
        let req = MotionRequest::default();

        for _ in 0..5 {
            let (action, report) = ctrl.proc(&req).unwrap();
            assert_eq!(action, ControlAction::Wait(Duration::from_millis(100)));
            assert_eq!(report.mode, Mode::Idle);
            assert_eq!(ctrl.gait().step(), 1);
        }
    }

    #[test]
    fn test_enable_produces_frames() {
        let mut ctrl = MotionCtrl::default();
        let mut req = enabled();
        req.gait_speed_ms = 45;

        let (action, report) = ctrl.proc(&req).unwrap();
        assert_eq!(report.mode, Mode::Active);
        assert!(!report.travel_requested);

        let frame = frame_of(action);
        assert_eq!(frame.duration_ms, Some(45));
        assert!(frame.positions.iter().all(|p| p.position != SERVO_OFF_POSITION));
        assert_eq!(ctrl.ack_timeout(&frame), Duration::from_millis(145));

        // Standing pose is reachable and within limits
        assert!(report.ik_status.iter().all(|s| *s == IkStatus::Solved));
        assert_eq!(report.num_clamped(), 0);

        // Mirror image legs produce mirrored positions
        let rm = LegId::RightMiddle.index() * 3;
        let lm = LegId::LeftMiddle.index() * 3;
        for j in 0..3 {
            let r = frame.positions[rm + j].position as i32;
            let l = frame.positions[lm + j].position as i32;
            assert!((r - 1500 + l - 1500).abs() <= 1, "joint {}: {} {}", j, r, l);
        }
    }

    #[test]
    fn test_disable_sequence() {
        let mut ctrl = MotionCtrl::default();
        let mut req = enabled();
        req.travel.z = -40.0;

        for _ in 0..5 {
            ctrl.proc(&req).unwrap();
        }
        let step = ctrl.gait().step();

        req.enabled = false;
        let (action, report) = ctrl.proc(&req).unwrap();
        assert_eq!(report.mode, Mode::ShuttingDown);
        match action {
            ControlAction::Release { settle, frame } => {
                assert_eq!(settle, Duration::from_millis(600));
                assert!(frame.is_release());
                assert_eq!(frame.duration_ms, None);
                for (p, ch) in frame.positions.iter().zip(DEFAULT_CHANNELS.iter()) {
                    assert_eq!(p.channel, *ch);
                }
            },
            a => panic!("Expected a release, got {:?}", a)
        }

        // Gait halted until re-enabled
        for _ in 0..5 {
            let (action, report) = ctrl.proc(&req).unwrap();
            assert!(matches!(action, ControlAction::Wait(_)));
            assert_eq!(report.mode, Mode::Idle);
            assert_eq!(ctrl.gait().step(), step);
        }

        // Re-enabling restarts the cycle from the neutral stance
        req.enabled = true;
        req.travel.z = 0.0;
        let (action, report) = ctrl.proc(&req).unwrap();
        assert!(matches!(action, ControlAction::Move(_)));
        assert_eq!(report.mode, Mode::Active);
        assert_eq!(report.gait_step, 1);
        assert_eq!(ctrl.gait().num_airborne(), 0);
    }

    #[test]
    fn test_dead_zone() {
        let mut ctrl = MotionCtrl::default();
        let mut req = enabled();
        req.travel = TravelVector { x: 0.5, z: -0.9, rot_y: 1.0 };

        for _ in 0..16 {
            let (_, report) = ctrl.proc(&req).unwrap();
            assert!(!report.travel_requested);
        }
        assert_eq!(ctrl.gait().num_airborne(), 0);

        req.travel.z = -1.5;
        let (_, report) = ctrl.proc(&req).unwrap();
        assert!(report.travel_requested);
    }

    #[test]
    fn test_tripod_walk_end_to_end() {
        let mut ctrl = MotionCtrl::default();
        let mut req = enabled();
        req.gait_type = GaitType::Tripod8;
        req.gait_speed_ms = 45;
        req.travel.z = -50.0;

        let mut lifts = [0u32; NUM_LEGS];
        let mut was_airborne = [false; NUM_LEGS];

        // Foot positions recovered from the joint angles actually sent
        let mut prev_z: Vec<f64> = ctrl.geometry.iter().map(|g| g.init_pos.z).collect();
        let mut stance_dz = [0f64; NUM_LEGS];

        for tick in 0..8 {
            let (action, report) = ctrl.proc(&req).unwrap();
            assert_eq!(report.gait_step, tick + 1);
            assert!(report.travel_requested);
            assert_eq!(report.num_not_solved(), 0);
            assert_eq!(report.num_clamped(), 0);
            assert_eq!(frame_of(action).duration_ms, Some(45));

            let n = ctrl.gait().num_airborne();
            assert!(n == 0 || n == 3, "tick {}: {} legs airborne", tick, n);

            for leg in LegId::ALL.iter() {
                let i = leg.index();
                let air = ctrl.gait().is_airborne(*leg);
                let foot = kinematics::forward(
                    &ctrl.params.dims,
                    &ctrl.geometry[i],
                    &ctrl.joint_angles()[i]
                );

                if air && !was_airborne[i] {
                    lifts[i] += 1;
                }
                if !air && !was_airborne[i] {
                    stance_dz[i] += foot.z - prev_z[i];
                }

                was_airborne[i] = air;
                prev_z[i] = foot.z;
            }
        }

        assert_eq!(ctrl.gait().step(), 1);
        assert_eq!(lifts, [1; NUM_LEGS]);

        // Planted feet push back by the full travel, moving the body -50 along Z
        for i in 0..NUM_LEGS {
            assert!((-stance_dz[i] - -50.0).abs() < 0.01, "leg {} moved {}", i, -stance_dz[i]);
        }
    }

    #[test]
    fn test_angles_always_within_limits() {
        let mut params = Params::default();
        params.limits = JointLimits::default();
        let limits = params.limits;
        let mut ctrl = MotionCtrl::new(params, ChannelMap::default()).unwrap();

        let mut req = enabled();
        req.travel = TravelVector { x: 40.0, z: -90.0, rot_y: 20.0 };

        for (i, pos_y) in [0.0, 65.0, 130.0, 300.0].iter().enumerate() {
            for rot in [-25.0, 0.0, 25.0].iter() {
                req.body.pos_y = *pos_y;
                req.body.rot_x = *rot;
                req.body.rot_z = -*rot;
                req.body.pos_x = 30.0 * i as f64;
                req.leg_y_offset[0] = -40.0 * i as f64;

                for _ in 0..4 {
                    ctrl.proc(&req).unwrap();
                    for a in ctrl.joint_angles().iter() {
                        assert!(a.coxa >= limits.coxa.min && a.coxa <= limits.coxa.max);
                        assert!(a.femur >= limits.femur.min && a.femur <= limits.femur.max);
                        assert!(a.tibia >= limits.tibia.min && a.tibia <= limits.tibia.max);
                    }
                }
            }
        }

        // The highest body position is beyond the legs' reach
        req.body = Default::default();
        req.body.pos_y = 300.0;
        let (_, report) = ctrl.proc(&req).unwrap();
        assert!(report.ik_status.iter().any(|s| *s == IkStatus::Unreachable));
    }

    #[test]
    fn test_gait_change_while_active() {
        let mut ctrl = MotionCtrl::default();
        let mut req = enabled();
        req.travel.z = -30.0;

        for _ in 0..10 {
            ctrl.proc(&req).unwrap();
        }

        req.gait_type = GaitType::Wave24;
        let (action, _) = ctrl.proc(&req).unwrap();
        frame_of(action);
        assert_eq!(ctrl.gait().plan().gait_type, GaitType::Wave24);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut map = ChannelMap::default();
        map.legs.pop();
        assert!(matches!(
            MotionCtrl::new(Params::default(), map),
            Err(MotionCtrlError::InvalidChannelMap(_))
        ));
    }
}
