//! Servo transport boundary
//!
//! Motion control only needs to send a frame and then wait for it to complete. How frames reach
//! the servos is up to the implementation.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use std::thread;
use std::time::{Duration, Instant};

use comms_if::eqpt::{ServoFrame, ServoFrameResponse};
use crate::servo_client::ServoClientError;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Something which can deliver servo frames.
pub trait ServoTransport {
    /// Start sending a frame.
    fn send_frame(&mut self, frame: &ServoFrame) -> Result<(), TransportError>;

    /// Wait up to `timeout` for the last sent frame to be applied.
    fn await_applied(&mut self, timeout: Duration) -> Result<(), TransportError>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Transport which delivers frames nowhere.
///
/// Frames are logged and acknowledged once their duration has elapsed, so the control loop keeps
/// its real timing without any hardware attached.
#[derive(Debug, Default)]
pub struct DryRunTransport {
    pending_until: Option<Instant>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("The servo server is not connected")]
    NotConnected,

    #[error("The frame was not acknowledged within {0:?}")]
    AckTimeout(Duration),

    #[error("The frame was rejected: {0:?}")]
    Rejected(ServoFrameResponse),

    #[error("No frame is waiting to be acknowledged")]
    NothingPending,

    #[error("Servo client error: {0}")]
    ClientError(ServoClientError)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<T: ServoTransport + ?Sized> ServoTransport for Box<T> {
    fn send_frame(&mut self, frame: &ServoFrame) -> Result<(), TransportError> {
        (**self).send_frame(frame)
    }

    fn await_applied(&mut self, timeout: Duration) -> Result<(), TransportError> {
        (**self).await_applied(timeout)
    }
}

impl DryRunTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ServoTransport for DryRunTransport {
    fn send_frame(&mut self, frame: &ServoFrame) -> Result<(), TransportError> {
        trace!("Dry run frame: {}", frame.to_ssc_command().trim_end());

        let duration = Duration::from_millis(frame.duration_ms.unwrap_or(0) as u64);
        self.pending_until = Some(Instant::now() + duration);

        Ok(())
    }

    fn await_applied(&mut self, timeout: Duration) -> Result<(), TransportError> {
        let until = self.pending_until.take().ok_or(TransportError::NothingPending)?;
        let remaining = until.saturating_duration_since(Instant::now());

        if remaining > timeout {
            thread::sleep(timeout);
            return Err(TransportError::AckTimeout(timeout))
        }

        thread::sleep(remaining);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
