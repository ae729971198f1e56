//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the software.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Telecommand definitions
pub mod tc;

/// Command and response definitions for equipment (the legs and their servos)
pub mod eqpt;

/// Network module
pub mod net;
