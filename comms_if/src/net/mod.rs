//! # Network Module
//!
//! Sockets between the hexapod executables are ZMQ sockets. [`MonitoredSocket`] wraps one with a
//! monitor thread so clients can tell whether their peer is actually there before sending.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::warn;
use std::{
    sync::{Arc, atomic::{AtomicBool, AtomicUsize, Ordering}},
    thread::{self, JoinHandle}
};
use zmq::{Socket, Context, SocketType, SocketEvent};

// Export zmq
pub use zmq;

// ------------------------------------------------------------------------------------------------
// MACROS
// ------------------------------------------------------------------------------------------------

macro_rules! set_sockopts {
    ($socket:expr, $(($opt:ident, $val:expr)),+) => {
        $(
            $socket.$opt($val)
                .map_err(|e| MonitoredSocketError::SocketOptionError(stringify!($opt).into(), e))?;
        )+
    };
}

// ------------------------------------------------------------------------------------------------
// STATICS
// ------------------------------------------------------------------------------------------------

/// Used to give every monitor a unique inproc endpoint.
static NUM_MONITORS: AtomicUsize = AtomicUsize::new(0);

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Receive timeout on the monitor socket, bounds how long a dropped socket waits for its monitor
/// thread.
///
/// Units: milliseconds
const MONITOR_POLL_TIMEOUT_MS: i32 = 100;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A zmq socket whose connection state is tracked by a monitor thread.
///
/// Derefs to the underlying [`Socket`] for sending and receiving.
pub struct MonitoredSocket {
    socket: Socket,
    monitor: Monitor
}

/// Background thread reading a socket's monitor events.
struct Monitor {
    endpoint: String,
    shutdown: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<()>>
}

/// Options applied to a monitored socket.
///
/// Timing options are in milliseconds and follow the
/// [`zmq_setsockopt`](http://api.zeromq.org/4-2:zmq-setsockopt) meanings. `REQ` specific options
/// are ignored for other socket types.
#[derive(Debug, Clone)]
pub struct SocketOptions {

    /// Bind to the endpoint instead of connecting to it.
    ///
    /// Default: `false`
    pub bind: bool,

    /// Make `MonitoredSocket::new()` wait until the socket connects, failing with
    /// `CouldNotConnect` if it doesn't.
    ///
    /// Default: `true`
    pub block_on_first_connect: bool,

    /// `ZMQ_REQ_CORRELATE`
    pub req_correlate: bool,

    /// `ZMQ_REQ_RELAXED`, allows a new request to be sent when a reply never arrived
    pub req_relaxed: bool,

    /// `ZMQ_LINGER`
    pub linger: i32,

    /// `ZMQ_RECONNECT_IVL`
    pub reconnect_ivl: i32,

    /// `ZMQ_RECONNECT_IVL_MAX`
    pub reconnect_ivl_max: i32,

    /// `ZMQ_CONNECT_TIMEOUT`
    pub connect_timeout: i32,

    /// `ZMQ_RCVTIMEO`, receives return `EAGAIN` after this long
    pub recv_timeout: i32,

    /// `ZMQ_SNDTIMEO`, sends return `EAGAIN` after this long
    pub send_timeout: i32,

    /// `ZMQ_HEARTBEAT_IVL`
    pub heartbeat_ivl: i32,

    /// `ZMQ_HEARTBEAT_TIMEOUT`
    pub heartbeat_timeout: i32,

    /// `ZMQ_HEARTBEAT_TTL`
    pub heartbeat_ttl: i32
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum MonitoredSocketError {
    #[error("Error creating the socket: {0}")]
    CreateSocketError(zmq::Error),

    #[error("Error enabling monitoring for the socket: {0}")]
    MonitoringEnableError(zmq::Error),

    #[error("Could not connect the socket: {0:?}")]
    CouldNotConnect(Option<zmq::Error>),

    #[error("Could not read event from monitor socket: {0}")]
    EventReadError(zmq::Error),

    #[error("Monitor socket sent an event without an address frame")]
    MalformedEvent,

    #[error("Could not set the {0} socket option: {1}")]
    SocketOptionError(String, zmq::Error),

    #[error("Could not start the monitor thread: {0}")]
    MonitorSpawnError(std::io::Error)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MonitoredSocket {
    /// Create a socket, apply the options and connect (or bind) it to `endpoint`, for example
    /// `"tcp://localhost:5020"`.
    ///
    /// Servers and clients which must start before their peer should clear
    /// `block_on_first_connect`.
    pub fn new(
        ctx: &Context,
        socket_type: SocketType,
        socket_options: SocketOptions,
        endpoint: &str
    ) -> Result<Self, MonitoredSocketError> {
        let socket = ctx.socket(socket_type)
            .map_err(MonitoredSocketError::CreateSocketError)?;

        let monitor_endpoint = format!(
            "inproc://monitor_{}",
            NUM_MONITORS.fetch_add(1, Ordering::Relaxed)
        );

        // The monitor must be attached before connecting or the first events are lost
        socket.monitor(&monitor_endpoint, SocketEvent::ALL as i32)
            .map_err(MonitoredSocketError::MonitoringEnableError)?;
        let monitor_socket = ctx.socket(zmq::PAIR)
            .map_err(MonitoredSocketError::CreateSocketError)?;
        monitor_socket.connect(&monitor_endpoint)
            .map_err(|e| MonitoredSocketError::CouldNotConnect(Some(e)))?;

        socket_options.set(&socket)?;

        match socket_options.bind {
            true => socket.bind(endpoint),
            false => socket.connect(endpoint)
        }.map_err(|e| MonitoredSocketError::CouldNotConnect(Some(e)))?;

        let connected = Arc::new(AtomicBool::new(false));

        if socket_options.block_on_first_connect {
            loop {
                match read_event(&monitor_socket)? {
                    SocketEvent::CONNECTED => break,
                    SocketEvent::CONNECT_DELAYED => continue,
                    _ => return Err(MonitoredSocketError::CouldNotConnect(None))
                }
            }

            connected.store(true, Ordering::Relaxed);
        }

        let monitor = Monitor::spawn(monitor_socket, monitor_endpoint, connected)?;

        Ok(Self {
            socket,
            monitor
        })
    }

    /// Return if the socket is connected or not.
    pub fn connected(&self) -> bool {
        self.monitor.connected.load(Ordering::Relaxed)
    }
}

impl std::ops::Deref for MonitoredSocket {
    type Target = Socket;

    fn deref(&self) -> &Self::Target {
        &self.socket
    }
}

impl std::ops::DerefMut for MonitoredSocket {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.socket
    }
}

impl Monitor {
    fn spawn(
        socket: Socket,
        endpoint: String,
        connected: Arc<AtomicBool>
    ) -> Result<Self, MonitoredSocketError> {
        // Polled from here on so the thread sees the shutdown flag
        socket.set_rcvtimeo(MONITOR_POLL_TIMEOUT_MS)
            .map_err(|e| MonitoredSocketError::SocketOptionError("set_rcvtimeo".into(), e))?;

        let shutdown = Arc::new(AtomicBool::new(false));

        let thread_shutdown = shutdown.clone();
        let thread_connected = connected.clone();
        let thread_endpoint = endpoint.clone();

        let join_handle = thread::Builder::new()
            .name(format!("monitor_{}", endpoint.trim_start_matches("inproc://monitor_")))
            .spawn(move || run_monitor(socket, thread_endpoint, thread_shutdown, thread_connected))
            .map_err(MonitoredSocketError::MonitorSpawnError)?;

        Ok(Self {
            endpoint,
            shutdown,
            connected,
            join_handle: Some(join_handle)
        })
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        if let Some(jh) = self.join_handle.take() {
            if jh.join().is_err() {
                warn!("Monitor thread for {} panicked", self.endpoint);
            }
        }
    }
}

impl SocketOptions {
    /// Set these options on the given socket.
    pub fn set(&self, socket: &Socket) -> Result<(), MonitoredSocketError> {
        set_sockopts!(
            socket,
            (set_connect_timeout, self.connect_timeout),
            (set_heartbeat_ivl, self.heartbeat_ivl),
            (set_heartbeat_timeout, self.heartbeat_timeout),
            (set_heartbeat_ttl, self.heartbeat_ttl),
            (set_linger, self.linger),
            (set_reconnect_ivl, self.reconnect_ivl),
            (set_reconnect_ivl_max, self.reconnect_ivl_max),
            (set_rcvtimeo, self.recv_timeout),
            (set_sndtimeo, self.send_timeout)
        );

        if let Ok(SocketType::REQ) = socket.get_socket_type() {
            set_sockopts!(
                socket,
                (set_req_correlate, self.req_correlate),
                (set_req_relaxed, self.req_relaxed)
            );
        }

        Ok(())
    }
}

impl Default for SocketOptions {
    fn default() -> Self {
        // zmq's own defaults, apart from blocking on first connect
        Self {
            bind: false,
            block_on_first_connect: true,
            connect_timeout: 0,
            heartbeat_ivl: 0,
            heartbeat_timeout: 0,
            heartbeat_ttl: 0,
            linger: 30_000,
            reconnect_ivl: 100,
            reconnect_ivl_max: 0,
            recv_timeout: -1,
            req_correlate: false,
            req_relaxed: false,
            send_timeout: -1
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Read an event from a monitor socket.
///
/// Each event is two messages, the event ID and value followed by the endpoint address.
fn read_event(socket: &Socket) -> Result<SocketEvent, MonitoredSocketError> {
    let msg = socket.recv_msg(0)
        .map_err(MonitoredSocketError::EventReadError)?;

    if msg.len() < 2 {
        return Err(MonitoredSocketError::MalformedEvent)
    }
    let event = u16::from_ne_bytes([msg[0], msg[1]]);

    let more = socket.get_rcvmore()
        .map_err(MonitoredSocketError::EventReadError)?;
    if !more {
        return Err(MonitoredSocketError::MalformedEvent)
    }

    // The address isn't needed
    socket.recv_msg(0)
        .map_err(MonitoredSocketError::EventReadError)?;

    Ok(SocketEvent::from_raw(event))
}

/// Update the connection flag for an event.
///
/// Connecting sockets see `CONNECTED`, binding sockets see `ACCEPTED`.
fn apply_event(event: SocketEvent, connected: &AtomicBool) {
    match event {
        SocketEvent::CONNECTED | SocketEvent::ACCEPTED =>
            connected.store(true, Ordering::Relaxed),
        SocketEvent::DISCONNECTED => connected.store(false, Ordering::Relaxed),
        _ => ()
    }
}

fn run_monitor(
    monitor: Socket,
    endpoint: String,
    shutdown: Arc<AtomicBool>,
    connected: Arc<AtomicBool>
) {
    while !shutdown.load(Ordering::Relaxed) {
        match read_event(&monitor) {
            Ok(e) => apply_event(e, &connected),
            Err(MonitoredSocketError::EventReadError(zmq::Error::EAGAIN)) => continue,
            Err(e) => {
                warn!("Stopping monitor {}: {}", endpoint, e);
                break
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_apply_event() {
        let connected = AtomicBool::new(false);

        apply_event(SocketEvent::CONNECT_DELAYED, &connected);
        assert!(!connected.load(Ordering::Relaxed));

        apply_event(SocketEvent::ACCEPTED, &connected);
        assert!(connected.load(Ordering::Relaxed));

        apply_event(SocketEvent::DISCONNECTED, &connected);
        assert!(!connected.load(Ordering::Relaxed));

        apply_event(SocketEvent::CONNECTED, &connected);
        assert!(connected.load(Ordering::Relaxed));
    }

    #[test]
    fn test_options_applied() {
        let ctx = Context::new();
        let socket = ctx.socket(zmq::REQ).unwrap();

        let opts = SocketOptions {
            recv_timeout: 250,
            linger: 1,
            req_relaxed: true,
            ..Default::default()
        };
        opts.set(&socket).unwrap();

        assert_eq!(socket.get_rcvtimeo().unwrap(), 250);
        assert_eq!(socket.get_linger().unwrap(), 1);
    }

    #[test]
    fn test_unconnected_socket_drops_promptly() {
        let ctx = Context::new();
        let socket = MonitoredSocket::new(
            &ctx,
            zmq::REQ,
            SocketOptions {
                block_on_first_connect: false,
                linger: 0,
                ..Default::default()
            },
            "tcp://localhost:5999"
        ).unwrap();

        assert!(!socket.connected());

        let start = std::time::Instant::now();
        drop(socket);
        assert!(start.elapsed() < std::time::Duration::from_secs(2));
    }
}
