//! # Equipment module
//!
//! Definitions shared between the motion core and the servo controller equipment.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod leg;
pub mod servo;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use leg::*;
pub use servo::*;
