//! Thread safe request surface

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use comms_if::{eqpt::LegId, tc::{ActiveFunction, GaitType}};
use super::MotionRequest;
use crate::{body_ctrl::BodyPose, gait_ctrl::TravelVector};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Handle used by input sources to change the motion request.
///
/// Clones share the same request. Every setter replaces its group of fields under one lock, so a
/// snapshot never sees half of an update.
#[derive(Clone, Default)]
pub struct RequestSurface {
    inner: Arc<(Mutex<MotionRequest>, Condvar)>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RequestSurface {
    pub fn new(initial: MotionRequest) -> Self {
        Self {
            inner: Arc::new((Mutex::new(initial), Condvar::new()))
        }
    }

    /// Replace the travel vector and gait speed.
    pub fn request_movement(&self, gait_speed_ms: u32, travel_x: f64, travel_z: f64, travel_rot_y: f64) {
        self.update(|r| {
            r.gait_speed_ms = gait_speed_ms;
            r.travel = TravelVector {
                x: travel_x,
                z: travel_z,
                rot_y: travel_rot_y
            };
        });
    }

    /// Replace the body pose.
    pub fn request_body_position(
        &self,
        rot_x: f64,
        rot_z: f64,
        pos_x: f64,
        pos_z: f64,
        pos_y: f64,
        rot_y: f64
    ) {
        self.update(|r| {
            r.body = BodyPose {
                rot_x,
                rot_y,
                rot_z,
                pos_x,
                pos_y,
                pos_z
            };
        });
    }

    pub fn request_set_gait_options(&self, gait_speed_ms: u32, leg_lift_height: f64) {
        self.update(|r| {
            r.gait_speed_ms = gait_speed_ms;
            r.leg_lift_height = leg_lift_height;
        });
    }

    pub fn request_set_gait_type(&self, gait_type: GaitType) {
        self.update(|r| r.gait_type = gait_type);
    }

    /// Enable or disable movement. Disabling settles the legs and releases the servos.
    pub fn request_set_movement(&self, enabled: bool) {
        self.update(|r| r.enabled = enabled);
    }

    /// Set the height correction for one leg.
    pub fn request_leg_y_height(&self, leg: LegId, offset: f64) {
        self.update(|r| r.leg_y_offset[leg.index()] = offset);
    }

    pub fn request_active_function(&self, function: ActiveFunction) {
        self.update(|r| r.active_function = function);
    }

    /// Get a copy of the current request.
    pub fn snapshot(&self) -> MotionRequest {
        *self.lock()
    }

    /// Block until the request's revision differs from `since_revision`, or the timeout elapses.
    ///
    /// Returns the latest request either way.
    pub fn wait_for_change(&self, since_revision: u64, timeout: Duration) -> MotionRequest {
        let (_, cvar) = &*self.inner;
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock();

        while guard.revision == since_revision {
            let now = Instant::now();
            if now >= deadline {
                break
            }

            guard = match cvar.wait_timeout(guard, deadline - now) {
                Ok((g, _)) => g,
                Err(p) => p.into_inner().0
            };
        }

        *guard
    }

    fn lock(&self) -> MutexGuard<'_, MotionRequest> {
        let (mutex, _) = &*self.inner;

        // A writer panicking mid-update can only leave plain data behind
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update<F: FnOnce(&mut MotionRequest)>(&self, f: F) {
        let (_, cvar) = &*self.inner;

        {
            let mut guard = self.lock();
            f(&mut *guard);
            guard.revision = guard.revision.wrapping_add(1);
            debug!("New motion request (revision {})", guard.revision);
        }

        cvar.notify_all();
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
