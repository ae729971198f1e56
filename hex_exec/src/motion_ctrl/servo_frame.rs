//! Conversion of joint angles into servo frames

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::{
    ChannelPos, LegId, LegSide, ServoFrame,
    NUM_JOINTS_PER_LEG, NUM_LEGS, NUM_SERVO_CHANNELS
};
use crate::kinematics::JointAngles;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Map a joint angle onto a servo pulse width.
///
/// Right side servos are mounted mirrored so their angles are negated. An angle of zero maps to
/// the centre of the servo's travel.
///
/// Units: `angle_deg` in degrees, output in microseconds.
pub fn angle_to_position(angle_deg: f64, side: LegSide, pwm_div: f64, pwm_offset: f64) -> u16 {
    let tenths = side.servo_sign() * angle_deg * 10.0;
    let pos = ((tenths + 900.0) * 1000.0 / pwm_div + pwm_offset).round();

    pos.max(1.0).min(u16::MAX as f64) as u16
}

/// Build the frame moving every servo to the given joint angles.
///
/// `channels` and `angles` are in `LegId::ALL` order.
pub fn build_frame(
    channels: &[u8; NUM_SERVO_CHANNELS],
    angles: &[JointAngles; NUM_LEGS],
    duration_ms: u32,
    pwm_div: f64,
    pwm_offset: f64
) -> ServoFrame {
    let mut positions = [ChannelPos::default(); NUM_SERVO_CHANNELS];

    for leg in LegId::ALL.iter() {
        let i = leg.index();
        let side = leg.side();
        let a = &angles[i];

        for (j, angle) in [a.coxa, a.femur, a.tibia].iter().enumerate() {
            let k = i * NUM_JOINTS_PER_LEG + j;
            positions[k] = ChannelPos {
                channel: channels[k],
                position: angle_to_position(*angle, side, pwm_div, pwm_offset)
            };
        }
    }

    ServoFrame {
        positions,
        duration_ms: Some(duration_ms)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::motion_ctrl::DEFAULT_CHANNELS;

    #[test]
    fn test_angle_to_position() {
        assert_eq!(angle_to_position(0.0, LegSide::Left, 991.0, 592.0), 1500);
        assert_eq!(angle_to_position(0.0, LegSide::Right, 991.0, 592.0), 1500);

        // Mirrored about the centre
        assert_eq!(angle_to_position(10.0, LegSide::Left, 991.0, 592.0), 1601);
        assert_eq!(angle_to_position(10.0, LegSide::Right, 991.0, 592.0), 1399);
        assert_eq!(angle_to_position(-10.0, LegSide::Left, 991.0, 592.0), 1399);
    }

    #[test]
    fn test_build_frame() {
        let mut angles = [JointAngles::default(); NUM_LEGS];
        angles[LegId::RightRear.index()].femur = 10.0;
        angles[LegId::LeftFront.index()].tibia = 10.0;

        let frame = build_frame(&DEFAULT_CHANNELS, &angles, 70, 991.0, 592.0);

        assert_eq!(frame.duration_ms, Some(70));
        assert!(!frame.is_release());

        for (p, ch) in frame.positions.iter().zip(DEFAULT_CHANNELS.iter()) {
            assert_eq!(p.channel, *ch);
        }

        assert_eq!(frame.positions[0].position, 1500);
        assert_eq!(frame.positions[1].position, 1399);
        assert_eq!(frame.positions[17].position, 1601);
        assert!(frame.to_ssc_command().starts_with("#0P1500#1P1399#2P1500#4P1500"));
        assert!(frame.to_ssc_command().ends_with("#26P1601T70\r"));
    }
}
