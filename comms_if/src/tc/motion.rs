//! # Motion telecommand types

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};
use std::{fmt, str::FromStr};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The gait patterns the hexapod can walk with.
///
/// The number in each name is the number of steps in one full gait cycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GaitType {
    Ripple12,
    Tripod8,
    TripleTripod12,
    TripleTripod16,
    Wave24,
    Tripod6
}

/// The parameter group a user control is currently editing.
///
/// Stored alongside the motion request for input sources, the motion core does not interpret it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActiveFunction {
    Walk,
    Translate,
    Rotate,
    SingleLeg
}

#[derive(Debug, thiserror::Error)]
pub enum MotionParseError {
    #[error("Unknown gait \"{0}\", expected one of {1}")]
    UnknownGait(String, &'static str),

    #[error("Unknown function \"{0}\", expected one of walk, translate, rotate, leg")]
    UnknownFunction(String)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl GaitType {
    pub const ALL: [GaitType; 6] = [
        GaitType::Ripple12,
        GaitType::Tripod8,
        GaitType::TripleTripod12,
        GaitType::TripleTripod16,
        GaitType::Wave24,
        GaitType::Tripod6
    ];

    fn short_name(self) -> &'static str {
        match self {
            GaitType::Ripple12 => "ripple12",
            GaitType::Tripod8 => "tripod8",
            GaitType::TripleTripod12 => "tt12",
            GaitType::TripleTripod16 => "tt16",
            GaitType::Wave24 => "wave24",
            GaitType::Tripod6 => "tripod6"
        }
    }
}

impl Default for GaitType {
    fn default() -> Self {
        GaitType::Tripod8
    }
}

impl fmt::Display for GaitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

impl FromStr for GaitType {
    type Err = MotionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();

        Self::ALL.iter()
            .copied()
            .find(|g| g.short_name() == lower)
            .ok_or(MotionParseError::UnknownGait(
                s.into(),
                "ripple12, tripod8, tt12, tt16, wave24, tripod6"
            ))
    }
}

impl Default for ActiveFunction {
    fn default() -> Self {
        ActiveFunction::Walk
    }
}

impl FromStr for ActiveFunction {
    type Err = MotionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "walk" => Ok(ActiveFunction::Walk),
            "translate" => Ok(ActiveFunction::Translate),
            "rotate" => Ok(ActiveFunction::Rotate),
            "leg" => Ok(ActiveFunction::SingleLeg),
            _ => Err(MotionParseError::UnknownFunction(s.into()))
        }
    }
}
