//! Datagram transport abstractions for the unbundler.
//!
//! The server only consumes opaque byte buffers through the
//! [`adapter::TransportAdapter`] trait defined here.

pub mod adapter;
pub mod udp;
