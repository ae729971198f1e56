//! # Leg identifiers
//!
//! The hexapod has six legs with a fixed assignment to physical mount points. Everything indexed
//! per leg (geometry, gait offsets, servo channels) uses the order defined by [`LegId::ALL`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};
use std::{fmt, str::FromStr};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of legs on the hexapod.
pub const NUM_LEGS: usize = 6;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Identifies one of the hexapod's legs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LegId {
    RightRear,
    RightMiddle,
    RightFront,
    LeftRear,
    LeftMiddle,
    LeftFront
}

/// Side of the body a leg is mounted on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegSide {
    Right,
    Left
}

#[derive(Debug, thiserror::Error)]
pub enum LegIdParseError {
    #[error("Unknown leg \"{0}\", expected one of rr, rm, rf, lr, lm, lf")]
    UnknownLeg(String)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl LegId {
    /// All legs in processing order. The last leg in this list closes a gait step.
    pub const ALL: [LegId; NUM_LEGS] = [
        LegId::RightRear,
        LegId::RightMiddle,
        LegId::RightFront,
        LegId::LeftRear,
        LegId::LeftMiddle,
        LegId::LeftFront
    ];

    /// Index of this leg into per-leg arrays.
    pub fn index(self) -> usize {
        match self {
            LegId::RightRear => 0,
            LegId::RightMiddle => 1,
            LegId::RightFront => 2,
            LegId::LeftRear => 3,
            LegId::LeftMiddle => 4,
            LegId::LeftFront => 5
        }
    }

    /// Get the leg at the given index, or `None` if the index is out of range.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn side(self) -> LegSide {
        match self {
            LegId::RightRear | LegId::RightMiddle | LegId::RightFront => LegSide::Right,
            LegId::LeftRear | LegId::LeftMiddle | LegId::LeftFront => LegSide::Left
        }
    }

    /// Short name used on the command line and in logs.
    pub fn short_name(self) -> &'static str {
        match self {
            LegId::RightRear => "rr",
            LegId::RightMiddle => "rm",
            LegId::RightFront => "rf",
            LegId::LeftRear => "lr",
            LegId::LeftMiddle => "lm",
            LegId::LeftFront => "lf"
        }
    }
}

impl fmt::Display for LegId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

impl FromStr for LegId {
    type Err = LegIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();

        Self::ALL.iter()
            .copied()
            .find(|l| l.short_name() == lower)
            .ok_or(LegIdParseError::UnknownLeg(s.into()))
    }
}

impl LegSide {
    /// Sign applied to joint angles when mapping them onto servo positions.
    ///
    /// Right side servos are mounted mirrored to the left side ones.
    pub fn servo_sign(self) -> f64 {
        match self {
            LegSide::Right => -1.0,
            LegSide::Left => 1.0
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
