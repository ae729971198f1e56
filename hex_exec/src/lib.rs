//! # Hexapod library.
//!
//! This library allows other crates in the workspace to access items defined inside the hexapod
//! crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Body control - rotates and translates the body above the feet
pub mod body_ctrl;

/// Gait control - sequences the lift and stance of every leg
pub mod gait_ctrl;

/// Kinematics - joint angles for foot positions and back again
pub mod kinematics;

/// Motion control - turns motion requests into servo frames on a control loop
pub mod motion_ctrl;

/// Executable parameters
pub mod params;

/// Motion request - shared request written by input sources and read by motion control
pub mod request;

/// Servo client - sends frames to the servo server
pub mod servo_client;

/// Telecommand client - recieves telecommands from the tc server
pub mod tc_client;

/// Telecommand processor - applies telecommands to the request surface
pub mod tc_processor;
