//! # Control loop tests
//!
//! Runs the control loop against an in-memory transport.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use comms_if::eqpt::{ServoFrame, SERVO_OFF_POSITION};
use hex_lib::{
    motion_ctrl::{ChannelMap, ControlLoop, MotionCtrl, Params, ServoTransport, TransportError},
    request::RequestSurface
};

/// Frames sent, with the time each was sent.
type FrameLog = Arc<Mutex<Vec<(Instant, ServoFrame)>>>;

struct MockTransport {
    log: FrameLog,
    fail_sends: bool,
    pending: Option<Duration>
}

impl MockTransport {
    fn new(fail_sends: bool) -> (Self, FrameLog) {
        let log = FrameLog::default();
        (
            Self {
                log: log.clone(),
                fail_sends,
                pending: None
            },
            log
        )
    }
}

impl ServoTransport for MockTransport {
    fn send_frame(&mut self, frame: &ServoFrame) -> Result<(), TransportError> {
        if self.fail_sends {
            return Err(TransportError::NotConnected)
        }

        self.log.lock().unwrap().push((Instant::now(), *frame));
        self.pending = Some(Duration::from_millis(frame.duration_ms.unwrap_or(0) as u64));
        Ok(())
    }

    fn await_applied(&mut self, timeout: Duration) -> Result<(), TransportError> {
        let d = self.pending.take().ok_or(TransportError::NothingPending)?;
        thread::sleep(d.min(timeout));
        Ok(())
    }
}

fn ctrl(settle_delay_ms: u64, idle_period_ms: u64) -> MotionCtrl {
    let params = Params {
        settle_delay_ms,
        idle_period_ms,
        ..Params::default()
    };

    MotionCtrl::new(params, ChannelMap::default()).unwrap()
}

fn wait_until<F: Fn() -> bool>(timeout: Duration, f: F) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if f() {
            return true
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

#[test]
fn test_disable_releases_servos() {
    let surface = RequestSurface::default();
    let (transport, log) = MockTransport::new(false);
    let control_loop = ControlLoop::spawn(ctrl(50, 10), transport, surface.clone()).unwrap();

    surface.request_movement(5, 0.0, -40.0, 0.0);
    surface.request_set_movement(true);

    assert!(wait_until(Duration::from_secs(2), || log.lock().unwrap().len() >= 10));
    assert!(log.lock().unwrap().iter().all(|(_, f)| !f.is_release() && f.duration_ms == Some(5)));

    let disabled_at = Instant::now();
    surface.request_set_movement(false);

    assert!(wait_until(Duration::from_secs(2), || {
        log.lock().unwrap().last().map(|(_, f)| f.is_release()).unwrap_or(false)
    }));

    let (released_at, release) = *log.lock().unwrap().last().unwrap();
    let elapsed = released_at - disabled_at;
    assert!(elapsed >= Duration::from_millis(50), "released after {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(500), "released after {:?}", elapsed);
    assert!(release.positions.iter().all(|p| p.position == SERVO_OFF_POSITION));
    assert_eq!(release.duration_ms, None);

    // No further frames while idle
    let num_frames = log.lock().unwrap().len();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(log.lock().unwrap().len(), num_frames);

    // Re-enabling resumes movement
    surface.request_set_movement(true);
    assert!(wait_until(Duration::from_secs(2), || log.lock().unwrap().len() > num_frames));

    let stats = control_loop.stop();
    assert_eq!(stats.send_failures, 0);
    assert_eq!(stats.ack_timeouts, 0);
    assert_eq!(stats.frames_sent as usize, log.lock().unwrap().len());
    assert!(stats.ticks > stats.frames_sent);
}

#[test]
fn test_transport_failures_do_not_stop_loop() {
    let surface = RequestSurface::default();
    let (transport, log) = MockTransport::new(true);
    let control_loop = ControlLoop::spawn(ctrl(50, 10), transport, surface.clone()).unwrap();

    surface.request_movement(5, 0.0, -40.0, 0.0);
    surface.request_set_movement(true);

    assert!(wait_until(Duration::from_secs(2), || control_loop.stats().send_failures >= 5));
    assert!(control_loop.is_running());
    assert!(log.lock().unwrap().is_empty());

    let stats = control_loop.stop();
    assert_eq!(stats.frames_sent, 0);
    assert!(stats.ticks >= stats.send_failures);
}

#[test]
fn test_idle_loop_wakes_on_request() {
    let surface = RequestSurface::default();
    let (transport, log) = MockTransport::new(false);

    // Long idle period, the loop must not wait it out once a request arrives
    let control_loop = ControlLoop::spawn(ctrl(50, 5000), transport, surface.clone()).unwrap();

    thread::sleep(Duration::from_millis(50));
    let enabled_at = Instant::now();
    surface.request_set_movement(true);

    assert!(wait_until(Duration::from_secs(2), || !log.lock().unwrap().is_empty()));
    let (first_at, _) = log.lock().unwrap()[0];
    assert!(first_at - enabled_at < Duration::from_millis(1000));

    // Disable so stopping doesn't wait on a long idle period
    surface.request_set_movement(false);
    assert!(wait_until(Duration::from_secs(2), || {
        log.lock().unwrap().last().map(|(_, f)| f.is_release()).unwrap_or(false)
    }));

    control_loop.stop();
}
