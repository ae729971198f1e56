//! Threaded control loop driving MotionCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{error, info, warn};
use serde::Serialize;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, PoisonError
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use comms_if::eqpt::ServoFrame;
use util::{archive::Archived, module::State};
use crate::request::RequestSurface;
use super::{ControlAction, MotionCtrl, ServoTransport, TransportError};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Longest the loop waits for a request before checking for shutdown.
const MAX_WAIT: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Handle to a running control loop.
///
/// Dropping the handle stops the loop.
pub struct ControlLoop {
    shutdown: Arc<AtomicBool>,
    stats: Arc<Mutex<LoopStats>>,
    handle: Option<JoinHandle<()>>
}

/// Counters kept by the control loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoopStats {
    pub ticks: u64,
    pub frames_sent: u64,
    pub send_failures: u64,
    pub ack_timeouts: u64,

    /// Frames the transport rejected or failed to acknowledge for reasons other than timing out
    pub ack_failures: u64
}

/// Everything owned by the loop thread.
struct Worker<T> {
    ctrl: MotionCtrl,
    transport: T,
    surface: RequestSurface,
    shutdown: Arc<AtomicBool>,
    stats: Arc<Mutex<LoopStats>>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ControlLoopError {
    #[error("Could not start the control loop thread: {0}")]
    SpawnError(std::io::Error)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ControlLoop {
    /// Start the loop on its own thread.
    pub fn spawn<T>(
        ctrl: MotionCtrl,
        transport: T,
        surface: RequestSurface
    ) -> Result<Self, ControlLoopError>
    where
        T: ServoTransport + Send + 'static
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(Mutex::new(LoopStats::default()));

        let worker = Worker {
            ctrl,
            transport,
            surface,
            shutdown: shutdown.clone(),
            stats: stats.clone()
        };

        let handle = thread::Builder::new()
            .name("motion_ctrl".into())
            .spawn(move || worker.run())
            .map_err(ControlLoopError::SpawnError)?;

        Ok(Self {
            shutdown,
            stats,
            handle: Some(handle)
        })
    }

    /// Get a copy of the loop's counters.
    pub fn stats(&self) -> LoopStats {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `true` while the loop thread is alive.
    pub fn is_running(&self) -> bool {
        self.handle.is_some() && !self.shutdown.load(Ordering::Relaxed)
    }

    /// Stop the loop, waiting for the current tick to finish.
    pub fn stop(mut self) -> LoopStats {
        self.join();
        self.stats()
    }

    fn join(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        if let Some(h) = self.handle.take() {
            if h.join().is_err() {
                error!("Control loop thread panicked");
            }
        }
    }
}

impl Drop for ControlLoop {
    fn drop(&mut self) {
        self.join();
    }
}

impl<T: ServoTransport> Worker<T> {
    fn run(mut self) {
        info!("Control loop started");

        while !self.shutdown.load(Ordering::Relaxed) {
            let request = self.surface.snapshot();

            let action = match self.ctrl.proc(&request) {
                Ok((action, _)) => action,
                Err(e) => {
                    error!("MotionCtrl processing failed: {}", e);
                    ControlAction::Wait(self.ctrl.params().idle_period())
                }
            };

            self.update_stats(|s| s.ticks += 1);

            match action {
                ControlAction::Wait(period) => {
                    self.surface.wait_for_change(request.revision, period.min(MAX_WAIT));
                },
                ControlAction::Move(frame) => self.deliver(&frame),
                ControlAction::Release { settle, frame } => {
                    info!("Waiting {:?} for the legs to settle", settle);
                    thread::sleep(settle);
                    self.deliver(&frame);
                }
            }
        }

        info!("Control loop stopped");
    }

    /// Send a frame and wait for it to be applied.
    ///
    /// Failures are logged and counted only, the next tick sends the current state again.
    fn deliver(&mut self, frame: &ServoFrame) {
        let timeout = self.ctrl.ack_timeout(frame);

        match self.transport.send_frame(frame) {
            Ok(()) => self.update_stats(|s| s.frames_sent += 1),
            Err(e) => {
                warn!("Could not send servo frame: {}", e);
                self.update_stats(|s| s.send_failures += 1);

                // Keep the tick rate while the transport is down
                thread::sleep(Duration::from_millis(frame.duration_ms.unwrap_or(0) as u64));
                return
            }
        }

        match self.transport.await_applied(timeout) {
            Ok(()) => (),
            Err(TransportError::AckTimeout(t)) => {
                warn!("Servo frame not acknowledged within {:?}", t);
                self.update_stats(|s| s.ack_timeouts += 1);
            },
            Err(e) => {
                warn!("Servo frame not applied: {}", e);
                self.update_stats(|s| s.ack_failures += 1);
            }
        }

        if let Err(e) = self.ctrl.write() {
            warn!("Could not archive MotionCtrl frame: {}", e);
        }
    }

    fn update_stats<F: FnOnce(&mut LoopStats)>(&self, f: F) {
        f(&mut *self.stats.lock().unwrap_or_else(PoisonError::into_inner));
    }
}
