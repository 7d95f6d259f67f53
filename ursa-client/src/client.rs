//! # Synchronous Client API
//!
//! Purpose: Expose a compact, blocking API for issuing ursadb commands over
//! a ZeroMQ REQ/REP socket.
//!
//! ## Design Principles
//! 1. **Stateless Calls**: Every call gets a fresh socket; only the ZeroMQ
//!    context and the endpoint string outlive a call.
//! 2. **Fail Fast On Transport**: Connect, send, receive, and parse failures
//!    surface immediately as errors.
//! 3. **Never Block On Close**: Sockets are created with zero linger so
//!    teardown abandons unsent data instead of waiting.
//! 4. **Bounded Admin Waits**: `status` and `topology` time out after two
//!    seconds; query traffic waits as long as the server needs.

use std::time::{Duration, Instant};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace};

use crate::command;
use crate::reply::{self, PopResult, QueryOutcome};

/// Receive timeout applied to administrative commands. Keeps callers from
/// hanging on a dead server when they only asked for status.
pub const ADMIN_RECV_TIMEOUT: Duration = Duration::from_millis(2000);

/// Result type for the client.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the client.
///
/// Server-reported protocol errors on `query` and `pop` are NOT here; those
/// decode into regular values (`QueryOutcome::Rejected`, locked/exhausted
/// `PopResult`).
#[derive(Debug, Error)]
pub enum ClientError {
    /// ZeroMQ failure while connecting, sending, or receiving.
    #[error("transport error: {0}")]
    Transport(#[from] zmq::Error),
    /// No reply arrived within the bounded receive timeout.
    #[error("no reply within {0:?}")]
    Timeout(Duration),
    /// Reply bytes were not valid UTF-8.
    #[error("reply was not UTF-8 text")]
    NonTextReply,
    /// Reply text was not valid JSON.
    #[error("reply was not valid JSON: {0}")]
    MalformedReply(#[from] serde_json::Error),
    /// Reply was JSON but did not match the envelope or command shape.
    #[error("reply shape did not match the command")]
    UnexpectedReply,
}

/// Blocking ursadb client.
///
/// Holds one shared ZeroMQ context and the server endpoint. Each operation
/// is an independent round trip: connect, send one command line, read one
/// JSON reply, close. Concurrent callers never share a socket.
pub struct UrsaClient {
    ctx: zmq::Context,
    endpoint: String,
}

impl UrsaClient {
    /// Creates a client for the given endpoint, e.g. `tcp://localhost:9281`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        UrsaClient {
            ctx: zmq::Context::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Endpoint this client talks to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Runs a `select` query and returns the server's verdict.
    ///
    /// The taints clause filters which datasets the query may touch; both it
    /// and the dataset clause are omitted when not supplied. A rejected
    /// query comes back as `QueryOutcome::Rejected` with the server message
    /// prefixed `ursadb failed:`; `Err` means the round trip itself failed.
    pub fn query(
        &self,
        expr: &str,
        taints: &[String],
        dataset: Option<&str>,
    ) -> ClientResult<QueryOutcome> {
        let command = command::select(expr, taints, dataset);
        let start = Instant::now();
        let raw = self.round_trip(&command, None)?;
        let elapsed = start.elapsed();
        reply::decode_query(&raw, elapsed)
    }

    /// Pops up to `count` files from a server-side iterator.
    ///
    /// A locked iterator (concurrent pop in flight) returns an empty result
    /// with `was_locked` set; the caller decides when to retry. Any other
    /// server error means the iterator is exhausted and safe to discard.
    pub fn pop(&self, iterator: &str, count: usize) -> ClientResult<PopResult> {
        let raw = self.round_trip(&command::pop(iterator, count), None)?;
        reply::decode_pop(&raw)
    }

    /// Fetches server status as raw JSON, with a bounded wait.
    pub fn status(&self) -> ClientResult<Value> {
        let raw = self.round_trip(command::STATUS, Some(ADMIN_RECV_TIMEOUT))?;
        reply::decode_raw(&raw)
    }

    /// Fetches the index topology as raw JSON, with a bounded wait.
    pub fn topology(&self) -> ClientResult<Value> {
        let raw = self.round_trip(command::TOPOLOGY, Some(ADMIN_RECV_TIMEOUT))?;
        reply::decode_raw(&raw)
    }

    /// Sends a caller-supplied command verbatim and returns the raw JSON
    /// reply. No validation; the caller owns the command syntax.
    pub fn execute(&self, raw_command: &str) -> ClientResult<Value> {
        let raw = self.round_trip(raw_command, None)?;
        reply::decode_raw(&raw)
    }

    /// One full request/reply exchange on a fresh REQ socket.
    ///
    /// `timeout` of `None` waits indefinitely; queries against large indexes
    /// can legitimately take minutes. The socket is dropped (and closed)
    /// whether or not the exchange succeeds.
    fn round_trip(&self, command: &str, timeout: Option<Duration>) -> ClientResult<String> {
        let socket = self.ctx.socket(zmq::REQ)?;
        socket.set_linger(0)?;
        let rcvtimeo = match timeout {
            Some(bound) => bound.as_millis() as i32,
            None => -1,
        };
        socket.set_rcvtimeo(rcvtimeo)?;
        socket.connect(&self.endpoint)?;

        debug!(endpoint = %self.endpoint, command = %command, "sending command");
        socket.send(command.as_bytes(), 0)?;

        match socket.recv_string(0) {
            Ok(Ok(text)) => {
                trace!(reply = %text, "received reply");
                Ok(text)
            }
            Ok(Err(_)) => Err(ClientError::NonTextReply),
            Err(zmq::Error::EAGAIN) => match timeout {
                Some(bound) => Err(ClientError::Timeout(bound)),
                None => Err(ClientError::Transport(zmq::Error::EAGAIN)),
            },
            Err(err) => Err(ClientError::Transport(err)),
        }
    }
}
