//! # Servo controller interface
//!
//! A [`ServoFrame`] carries one position demand for each of the 18 leg servos. Frames are sent to
//! the servo server as JSON, which replies with a [`ServoFrameResponse`] once the frame has been
//! applied by the controller.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};
use std::fmt::Write;

use super::NUM_LEGS;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of joints on each leg (coxa, femur, tibia).
pub const NUM_JOINTS_PER_LEG: usize = 3;

/// Number of servo channels driven by the motion core.
pub const NUM_SERVO_CHANNELS: usize = NUM_LEGS * NUM_JOINTS_PER_LEG;

/// Position value which releases a servo (stops driving it).
pub const SERVO_OFF_POSITION: u16 = 0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Position demand for a single servo channel.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPos {
    /// Channel number on the servo controller
    pub channel: u8,

    /// Demanded pulse width.
    ///
    /// Units: microseconds, or `SERVO_OFF_POSITION` to release the servo
    pub position: u16
}

/// A complete set of servo demands, ordered leg by leg with coxa, femur and tibia for each.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServoFrame {
    /// Position of every channel
    pub positions: [ChannelPos; NUM_SERVO_CHANNELS],

    /// Time the controller should take to move to the new positions, or `None` for a release
    /// frame.
    ///
    /// Units: milliseconds
    pub duration_ms: Option<u32>
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Response from the servo server to a frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServoFrameResponse {
    /// The frame was applied by the controller
    FrameApplied,

    /// The frame could not be interpreted by the server
    FrameInvalid,

    /// The servo equipment is not in a state which can execute frames
    EqptInvalid
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ServoFrame {
    /// Build the frame which releases every servo on the given channels.
    pub fn release(channels: &[u8; NUM_SERVO_CHANNELS]) -> Self {
        let mut positions = [ChannelPos::default(); NUM_SERVO_CHANNELS];

        for (pos, &channel) in positions.iter_mut().zip(channels.iter()) {
            pos.channel = channel;
            pos.position = SERVO_OFF_POSITION;
        }

        Self {
            positions,
            duration_ms: None
        }
    }

    /// Returns `true` if every channel in the frame is released.
    pub fn is_release(&self) -> bool {
        self.positions.iter().all(|p| p.position == SERVO_OFF_POSITION)
    }

    /// Render the frame in the serial servo controller's group move syntax.
    ///
    /// For example `#0P1500#1P1420T45\r`. Release frames carry no move time.
    pub fn to_ssc_command(&self) -> String {
        let mut cmd = String::with_capacity(NUM_SERVO_CHANNELS * 8 + 8);

        for p in self.positions.iter() {
            // Writing into a String cannot fail
            write!(cmd, "#{}P{}", p.channel, p.position).ok();
        }

        if let Some(t) = self.duration_ms {
            write!(cmd, "T{}", t).ok();
        }

        cmd.push('\r');

        cmd
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn channels() -> [u8; NUM_SERVO_CHANNELS] {
        let mut c = [0u8; NUM_SERVO_CHANNELS];
        for (i, ch) in c.iter_mut().enumerate() {
            *ch = i as u8;
        }
        c
    }

    #[test]
    fn test_release_frame() {
        let frame = ServoFrame::release(&channels());

        assert!(frame.is_release());
        assert_eq!(frame.duration_ms, None);
        assert_eq!(frame.positions[17].channel, 17);

        let cmd = frame.to_ssc_command();
        assert!(cmd.starts_with("#0P0#1P0"));
        assert!(cmd.ends_with("#17P0\r"));
        assert!(!cmd.contains('T'));
    }

    #[test]
    fn test_ssc_command() {
        let mut frame = ServoFrame::release(&channels());
        frame.positions[0].position = 1500;
        frame.positions[1].position = 1420;
        frame.duration_ms = Some(45);

        assert!(!frame.is_release());

        let cmd = frame.to_ssc_command();
        assert!(cmd.starts_with("#0P1500#1P1420#2P0"));
        assert!(cmd.ends_with("#17P0T45\r"));
    }
}
