//! Module interfaces
//!
//! Cyclic modules in `hex_exec` implement [`State`] so they are set up from parameter files and
//! stepped the same way, whether by the control loop thread or by a test.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::session::Session;

// ---------------------------------------------------------------------------
// MODULE STATE
// ---------------------------------------------------------------------------

/// A cyclic module's internal state.
pub trait State {
    /// Data needed by `init`, usually parameter file names
    type InitData;
    type InitError;

    /// Data consumed by one tick
    type InputData;
    /// Data produced by one tick
    type OutputData;
    /// Diagnostics produced alongside the output of a tick
    type StatusReport;
    type ProcError;

    /// Load parameters and open any archives in the session.
    ///
    /// A module which fails to initialise must not be stepped.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>;

    /// Run one tick.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;
}
