//! # Telecommand processor module
//!
//! The telecommand processor handles TCs coming from any source by passing them on to the request
//! surface.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;

use comms_if::tc::Tc;
use crate::request::RequestSurface;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a telecommand.
pub fn exec(surface: &RequestSurface, tc: &Tc) {
    match *tc {
        Tc::Heartbeat => debug!("Recieved Heartbeat"),
        Tc::Movement { gait_speed_ms, travel_x, travel_z, travel_rot_y } => {
            surface.request_movement(gait_speed_ms, travel_x, travel_z, travel_rot_y)
        },
        Tc::BodyPosition { rot_x, rot_z, pos_x, pos_z, pos_y, rot_y } => {
            surface.request_body_position(rot_x, rot_z, pos_x, pos_z, pos_y, rot_y)
        },
        Tc::GaitOptions { gait_speed_ms, leg_lift_height } => {
            surface.request_set_gait_options(gait_speed_ms, leg_lift_height)
        },
        Tc::GaitType { gait_type } => surface.request_set_gait_type(gait_type),
        Tc::SetMovement { enabled } => surface.request_set_movement(enabled),
        Tc::LegYHeight { leg, offset } => surface.request_leg_y_height(leg, offset),
        Tc::ActiveFunction { function } => surface.request_active_function(function)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::{eqpt::LegId, tc::{ActiveFunction, GaitType}};

    #[test]
    fn test_tcs_reach_surface() {
        let surface = RequestSurface::default();

        let tcs = [
            r#"{"type": "Movement", "gait_speed_ms": 45, "travel_x": 0.0, "travel_z": -50.0, "travel_rot_y": 2.0}"#,
            r#"{"type": "GaitType", "gait_type": "Wave24"}"#,
            r#"{"type": "LegYHeight", "leg": "LeftMiddle", "offset": 4.0}"#,
            r#"{"type": "ActiveFunction", "function": "Translate"}"#,
            r#"{"type": "SetMovement", "enabled": true}"#,
            r#"{"type": "Heartbeat"}"#
        ];

        for s in tcs.iter() {
            exec(&surface, &Tc::from_json(s).unwrap());
        }

        let req = surface.snapshot();
        assert_eq!(req.gait_speed_ms, 45);
        assert_eq!(req.travel.z, -50.0);
        assert_eq!(req.travel.rot_y, 2.0);
        assert_eq!(req.gait_type, GaitType::Wave24);
        assert_eq!(req.leg_y_offset[LegId::LeftMiddle.index()], 4.0);
        assert_eq!(req.active_function, ActiveFunction::Translate);
        assert!(req.enabled);

        // Heartbeats leave the request alone
        assert_eq!(req.revision, 5);
    }

    #[test]
    fn test_body_and_gait_options() {
        let surface = RequestSurface::default();

        exec(&surface, &Tc::BodyPosition {
            rot_x: 5.0, rot_z: -5.0, pos_x: 10.0, pos_z: -10.0, pos_y: 80.0, rot_y: 15.0
        });
        exec(&surface, &Tc::GaitOptions { gait_speed_ms: 90, leg_lift_height: 35.0 });

        let req = surface.snapshot();
        assert_eq!(req.body.rot_x, 5.0);
        assert_eq!(req.body.rot_z, -5.0);
        assert_eq!(req.body.pos_y, 80.0);
        assert_eq!(req.body.rot_y, 15.0);
        assert_eq!(req.gait_speed_ms, 90);
        assert_eq!(req.leg_lift_height, 35.0);
    }
}
