//! Leg to servo channel mapping

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

use comms_if::eqpt::{LegId, NUM_JOINTS_PER_LEG, NUM_LEGS, NUM_SERVO_CHANNELS};
use super::MotionCtrlError;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of channels on the servo controller.
pub const NUM_CONTROLLER_CHANNELS: u8 = 32;

/// Channels used by default, in `LegId::ALL` order with coxa, femur and tibia for each leg.
pub const DEFAULT_CHANNELS: [u8; NUM_SERVO_CHANNELS] = [
    0, 1, 2,
    4, 5, 6,
    8, 9, 10,
    16, 17, 18,
    20, 21, 22,
    24, 25, 26
];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Servo channels driving the joints of one leg.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegChannels {
    pub leg: LegId,
    pub coxa: u8,
    pub femur: u8,
    pub tibia: u8
}

/// Assignment of servo controller channels to leg joints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMap {
    pub legs: Vec<LegChannels>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ChannelMap {
    fn default() -> Self {
        Self {
            legs: LegId::ALL.iter().map(|leg| {
                let i = leg.index() * NUM_JOINTS_PER_LEG;
                LegChannels {
                    leg: *leg,
                    coxa: DEFAULT_CHANNELS[i],
                    femur: DEFAULT_CHANNELS[i + 1],
                    tibia: DEFAULT_CHANNELS[i + 2]
                }
            }).collect()
        }
    }
}

impl ChannelMap {
    /// Check the map and flatten it into `LegId::ALL` order, with coxa, femur and tibia channels
    /// for each leg.
    pub fn channels(&self) -> Result<[u8; NUM_SERVO_CHANNELS], MotionCtrlError> {
        let mut seen_legs = [false; NUM_LEGS];
        let mut seen_channels = [false; NUM_CONTROLLER_CHANNELS as usize];
        let mut out = [0u8; NUM_SERVO_CHANNELS];

        for entry in self.legs.iter() {
            let i = entry.leg.index();
            if seen_legs[i] {
                return Err(MotionCtrlError::InvalidChannelMap(
                    format!("leg {} is mapped more than once", entry.leg)
                ))
            }
            seen_legs[i] = true;

            for (j, &ch) in [entry.coxa, entry.femur, entry.tibia].iter().enumerate() {
                if ch >= NUM_CONTROLLER_CHANNELS {
                    return Err(MotionCtrlError::InvalidChannelMap(format!(
                        "channel {} of leg {} is outside the controller's {} channels",
                        ch, entry.leg, NUM_CONTROLLER_CHANNELS
                    )))
                }
                if seen_channels[ch as usize] {
                    return Err(MotionCtrlError::InvalidChannelMap(
                        format!("channel {} is used more than once", ch)
                    ))
                }
                seen_channels[ch as usize] = true;
                out[i * NUM_JOINTS_PER_LEG + j] = ch;
            }
        }

        if let Some(missing) = LegId::ALL.iter().find(|l| !seen_legs[l.index()]) {
            return Err(MotionCtrlError::InvalidChannelMap(
                format!("leg {} has no channels", missing)
            ))
        }

        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_map() {
        assert_eq!(ChannelMap::default().channels().unwrap(), DEFAULT_CHANNELS);
    }

    #[test]
    fn test_map_from_toml() {
        let map: ChannelMap = util::params::from_str(r#"
            [[legs]]
            leg = "LeftFront"
            coxa = 31
            femur = 30
            tibia = 29

            [[legs]]
            leg = "RightRear"
            coxa = 0
            femur = 1
            tibia = 2

            [[legs]]
            leg = "RightMiddle"
            coxa = 3
            femur = 4
            tibia = 5

            [[legs]]
            leg = "RightFront"
            coxa = 6
            femur = 7
            tibia = 8

            [[legs]]
            leg = "LeftRear"
            coxa = 9
            femur = 10
            tibia = 11

            [[legs]]
            leg = "LeftMiddle"
            coxa = 12
            femur = 13
            tibia = 14
        "#).unwrap();

        let ch = map.channels().unwrap();
        assert_eq!(&ch[..3], &[0, 1, 2]);
        assert_eq!(&ch[15..], &[31, 30, 29]);
    }

    #[test]
    fn test_invalid_maps() {
        let mut map = ChannelMap::default();
        map.legs.remove(2);
        assert!(matches!(map.channels(), Err(MotionCtrlError::InvalidChannelMap(_))));

        let mut map = ChannelMap::default();
        map.legs[1].tibia = map.legs[4].coxa;
        assert!(matches!(map.channels(), Err(MotionCtrlError::InvalidChannelMap(_))));

        let mut map = ChannelMap::default();
        map.legs[0].femur = 32;
        assert!(matches!(map.channels(), Err(MotionCtrlError::InvalidChannelMap(_))));

        let mut map = ChannelMap::default();
        map.legs[5].leg = LegId::LeftRear;
        assert!(matches!(map.channels(), Err(MotionCtrlError::InvalidChannelMap(_))));
    }
}
