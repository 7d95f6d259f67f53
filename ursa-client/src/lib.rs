//! # UrsaDB Sync Client
//!
//! Purpose: Provide a lightweight, synchronous client for an ursadb index
//! server, speaking its line-oriented command language over ZeroMQ REQ/REP.
//!
//! ## Design Principles
//! 1. **One Round Trip Per Call**: Every operation opens a fresh socket,
//!    sends one command, reads one reply, and closes. No pooling, no state.
//! 2. **Errors As Data**: Server-reported failures are regular return values;
//!    `Err` is reserved for transport and parse failures.
//! 3. **Caller-Driven Retry**: Locked iterators are reported, never retried
//!    internally.
//! 4. **Protocol Clarity**: Command assembly and reply decoding are explicit
//!    and pinned by tests.

mod client;
mod command;
mod reply;

pub use client::{ClientError, ClientResult, UrsaClient, ADMIN_RECV_TIMEOUT};
pub use reply::{PopResult, QueryOutcome, QueryResult};
