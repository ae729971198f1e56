//! # Telecommand client
//!
//! Receives telecommands from the ground console. The console owns the bound `REQ` socket, this
//! client connects a `REP` socket to it and answers every request with a [`TcResponse`], so the
//! console never waits on a TC which was dropped.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::warn;

use comms_if::{
    net::{zmq, MonitoredSocket, SocketOptions, MonitoredSocketError},
    tc::{Tc, TcParseError, TcResponse}
};

use crate::params::HexExecParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct TcClient {
    socket: MonitoredSocket,

    /// Response whose send timed out, the REP socket can't receive until it has gone
    unsent: Option<String>
}

/// Counts consecutive failed TC cycles.
#[derive(Debug, Clone)]
pub struct TcFaultCounter {
    consecutive: u32,
    limit: u32
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TcClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("The ground console is not connected")]
    NotConnected,

    #[error("Could not send a response to the console: {0}")]
    SendError(zmq::Error),

    #[error("Could not receive a message from the console: {0}")]
    RecvError(zmq::Error),

    #[error("Could not serialize the response: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not parse the received telecommand: {0}")]
    TcParseError(TcParseError),

    #[error("The console sent a message which was not valid UTF-8")]
    NonUtf8Request
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TcClient {
    /// Connect to the console at `tc_endpoint`. Does not wait for the console to be running.
    pub fn new(ctx: &zmq::Context, params: &HexExecParams) -> Result<Self, TcClientError> {
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 1,
            recv_timeout: 10,
            send_timeout: 10,
            ..Default::default()
        };

        MonitoredSocket::new(ctx, zmq::REP, socket_options, &params.tc_endpoint)
            .map(|socket| Self { socket, unsent: None })
            .map_err(TcClientError::SocketError)
    }

    pub fn is_connected(&self) -> bool {
        self.socket.connected()
    }

    /// Handle every TC waiting on the socket, returning how many were handled.
    ///
    /// `handler` gives the response for each valid TC. Malformed TCs are answered with
    /// `TcResponse::Invalid` and logged, they don't stop the remaining TCs being handled. A
    /// response which couldn't be sent is kept and sent first on the next call.
    pub fn serve<F>(&mut self, mut handler: F) -> Result<usize, TcClientError>
    where
        F: FnMut(&Tc) -> TcResponse
    {
        if !self.socket.connected() {
            return Err(TcClientError::NotConnected)
        }

        if let Some(response_str) = self.unsent.take() {
            self.send_str(response_str)?;
        }

        let mut num_handled = 0;

        loop {
            let msg = match self.socket.recv_bytes(0) {
                Ok(m) => m,
                Err(zmq::Error::EAGAIN) => return Ok(num_handled),
                Err(e) => return Err(TcClientError::RecvError(e))
            };

            let response = match decode_tc(&msg) {
                Ok(tc) => {
                    num_handled += 1;
                    handler(&tc)
                },
                Err(e) => {
                    warn!("Rejecting telecommand: {}", e);
                    TcResponse::Invalid
                }
            };

            let response_str = serde_json::to_string(&response)
                .map_err(TcClientError::SerializationError)?;
            self.send_str(response_str)?;
        }
    }

    fn send_str(&mut self, response_str: String) -> Result<(), TcClientError> {
        match self.socket.send(response_str.as_str(), 0) {
            Ok(()) => Ok(()),
            Err(zmq::Error::EAGAIN) => {
                self.unsent = Some(response_str);
                Err(TcClientError::SendError(zmq::Error::EAGAIN))
            },
            Err(e) => Err(TcClientError::SendError(e))
        }
    }
}

impl TcFaultCounter {
    pub fn new(limit: u32) -> Self {
        Self {
            consecutive: 0,
            limit
        }
    }

    /// Record the result of one `TcClient::serve` call.
    ///
    /// Returns `false` once `limit` calls in a row have failed. A missing console is not a fault,
    /// it is handled by disabling movement.
    pub fn record(&mut self, result: &Result<usize, TcClientError>) -> bool {
        match result {
            Ok(_) | Err(TcClientError::NotConnected) => self.consecutive = 0,
            Err(_) => self.consecutive += 1
        }

        self.consecutive < self.limit
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn decode_tc(msg: &[u8]) -> Result<Tc, TcClientError> {
    let tc_str = std::str::from_utf8(msg)
        .map_err(|_| TcClientError::NonUtf8Request)?;

    Tc::from_json(tc_str).map_err(TcClientError::TcParseError)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::time::{Duration, Instant};

    fn params(tc_endpoint: &str) -> HexExecParams {
        HexExecParams {
            tc_endpoint: tc_endpoint.into(),
            servo_endpoint: "tcp://localhost:5031".into(),
            dry_run: true,
            cycle_period_ms: 20,
            max_tc_faults: 3
        }
    }

    #[test]
    fn test_decode_tc() {
        assert_eq!(
            decode_tc(br#"{"type": "SetMovement", "enabled": true}"#).unwrap(),
            Tc::SetMovement { enabled: true }
        );

        assert!(matches!(decode_tc(&[0xff, 0xfe]), Err(TcClientError::NonUtf8Request)));
        assert!(matches!(
            decode_tc(br#"{"type": "Fly"}"#),
            Err(TcClientError::TcParseError(_))
        ));
    }

    #[test]
    fn test_fault_counter() {
        let mut faults = TcFaultCounter::new(3);
        let timeout = || -> Result<usize, TcClientError> {
            Err(TcClientError::SendError(zmq::Error::EAGAIN))
        };

        assert!(faults.record(&timeout()));
        assert!(faults.record(&timeout()));
        assert_eq!(faults.consecutive(), 2);

        // A good cycle clears the count
        assert!(faults.record(&Ok(1)));
        assert_eq!(faults.consecutive(), 0);

        // Losing the console isn't counted
        assert!(faults.record(&Err(TcClientError::NotConnected)));
        assert_eq!(faults.consecutive(), 0);

        assert!(faults.record(&timeout()));
        assert!(faults.record(&timeout()));
        assert!(!faults.record(&timeout()));
    }

    #[test]
    fn test_serve_without_console() {
        let ctx = zmq::Context::new();
        let mut client = TcClient::new(&ctx, &params("tcp://localhost:5721")).unwrap();

        let mut calls = 0;
        let result = client.serve(|_| {
            calls += 1;
            TcResponse::Ok
        });

        assert!(matches!(result, Err(TcClientError::NotConnected)));
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_serve_answers_console() {
        let ctx = zmq::Context::new();

        let console = ctx.socket(zmq::REQ).unwrap();
        console.set_linger(0).unwrap();
        console.set_rcvtimeo(2000).unwrap();
        console.bind("tcp://127.0.0.1:5722").unwrap();

        let mut client = TcClient::new(&ctx, &params("tcp://127.0.0.1:5722")).unwrap();

        let start = Instant::now();
        while !client.is_connected() && start.elapsed() < Duration::from_secs(2) {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(client.is_connected());

        console.send(r#"{"type": "SetMovement", "enabled": true}"#, 0).unwrap();

        let mut received = Vec::new();
        let start = Instant::now();
        while received.is_empty() && start.elapsed() < Duration::from_secs(2) {
            client.serve(|tc| {
                received.push(*tc);
                TcResponse::Ok
            }).unwrap();
        }

        assert_eq!(received, vec![Tc::SetMovement { enabled: true }]);
        assert_eq!(console.recv_string(0).unwrap().unwrap(), r#""Ok""#);

        // A malformed TC is answered without reaching the handler
        console.send("not a tc", 0).unwrap();
        let mut calls = 0;
        let start = Instant::now();
        let mut response = None;
        while response.is_none() && start.elapsed() < Duration::from_secs(2) {
            client.serve(|_| {
                calls += 1;
                TcResponse::Ok
            }).unwrap();
            response = console.recv_string(zmq::DONTWAIT).ok().and_then(|r| r.ok());
        }

        assert_eq!(response.as_deref(), Some(r#""Invalid""#));
        assert_eq!(calls, 0);
    }
}
