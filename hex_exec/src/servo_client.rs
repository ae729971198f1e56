//! # Servo Client
//!
//! Sends servo frames to the servo server, which drives the serial servo controller and replies
//! once each frame has been applied.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::Duration;

use comms_if::{
    net::{zmq, MonitoredSocket, SocketOptions, MonitoredSocketError},
    eqpt::{ServoFrame, ServoFrameResponse}
};

use crate::{
    motion_ctrl::{ServoTransport, TransportError},
    params::HexExecParams
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct ServoClient {
    socket: MonitoredSocket,

    /// A frame has been sent and its response not yet read
    pending: bool
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum ServoClientError {

    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("The client is not connected to the server")]
    NotConnected,

    #[error("Could not send the frame to the server: {0}")]
    SendError(zmq::Error),

    #[error("Could not poll the socket: {0}")]
    PollError(zmq::Error),

    #[error("Could not recieve a message from the server: {0}")]
    RecvError(zmq::Error),

    #[error("Could not serialize the data: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not deserialize the response from the server: {0}")]
    DeserializeError(serde_json::Error),

    #[error("The server sent a message which was not valid UTF-8")]
    NonUtf8Response
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ServoClient {
    /// Create a new instance of the servo client.
    ///
    /// Does not wait for the server, frames sent before it connects fail with `NotConnected`.
    pub fn new(ctx: &zmq::Context, params: &HexExecParams) -> Result<Self, ServoClientError> {
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 1,
            send_timeout: 10,
            req_correlate: true,
            req_relaxed: true,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(
            ctx,
            zmq::REQ,
            socket_options,
            &params.servo_endpoint
        ).map_err(ServoClientError::SocketError)?;

        Ok(Self {
            socket,
            pending: false
        })
    }

    pub fn is_connected(&self) -> bool {
        self.socket.connected()
    }

    /// Send a frame to the server.
    ///
    /// Any response still outstanding for the previous frame is abandoned.
    pub fn send(&mut self, frame: &ServoFrame) -> Result<(), ServoClientError> {
        if !self.socket.connected() {
            return Err(ServoClientError::NotConnected)
        }

        let frame_str = serde_json::to_string(frame)
            .map_err(ServoClientError::SerializationError)?;

        self.socket.send(&frame_str, 0)
            .map_err(ServoClientError::SendError)?;
        self.pending = true;

        Ok(())
    }

    /// Wait up to `timeout` for the server's response to the last frame.
    ///
    /// Returns `Ok(None)` if no response arrived in time.
    pub fn recv_response(
        &mut self,
        timeout: Duration
    ) -> Result<Option<ServoFrameResponse>, ServoClientError> {
        let num_events = self.socket.poll(zmq::POLLIN, timeout.as_millis() as i64)
            .map_err(ServoClientError::PollError)?;

        if num_events == 0 {
            return Ok(None)
        }

        self.pending = false;

        let msg = match self.socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => return Err(ServoClientError::NonUtf8Response),
            Err(zmq::Error::EAGAIN) => return Ok(None),
            Err(e) => return Err(ServoClientError::RecvError(e))
        };

        serde_json::from_str(&msg)
            .map(Some)
            .map_err(ServoClientError::DeserializeError)
    }
}

impl ServoTransport for ServoClient {
    fn send_frame(&mut self, frame: &ServoFrame) -> Result<(), TransportError> {
        self.send(frame).map_err(|e| match e {
            ServoClientError::NotConnected => TransportError::NotConnected,
            e => TransportError::ClientError(e)
        })
    }

    fn await_applied(&mut self, timeout: Duration) -> Result<(), TransportError> {
        if !self.pending {
            return Err(TransportError::NothingPending)
        }

        match self.recv_response(timeout) {
            Ok(Some(ServoFrameResponse::FrameApplied)) => Ok(()),
            Ok(Some(r)) => Err(TransportError::Rejected(r)),
            Ok(None) => Err(TransportError::AckTimeout(timeout)),
            Err(e) => Err(TransportError::ClientError(e))
        }
    }
}
