use std::collections::VecDeque;
use std::hash::Hash;

use thiserror::Error;

/// Coarse per-adapter transport health counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportHealthSnapshot {
    pub outbound_send_ok: u64,
    pub outbound_send_err: u64,
    pub inbound_received: u64,
    pub inbound_errors: u64,
    pub last_error: Option<String>,
}

/// Byte-oriented datagram contract consumed by the server receive loop.
pub trait TransportAdapter {
    /// Opaque peer handle used for replies/routing.
    type Peer: Clone + Eq + Hash;
    /// Transport-specific send error.
    type Error;

    /// Attempts best-effort delivery of one datagram to a peer.
    fn send(&mut self, peer: &Self::Peer, bytes: &[u8]) -> Result<(), Self::Error>;
    /// Returns the next inbound datagram and its sender, if any is ready.
    fn recv(&mut self) -> Option<(Self::Peer, Vec<u8>)>;

    /// Best-effort transport health counters.
    fn health_snapshot(&self) -> TransportHealthSnapshot {
        TransportHealthSnapshot::default()
    }
}

/// One captured datagram and the peer it came from or went to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub peer: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InMemoryError {
    #[error("adapter is closed")]
    Closed,
    #[error("datagram of {len} bytes exceeds limit of {limit}")]
    Oversize { len: usize, limit: usize },
}

/// In-memory datagram queue for tests and simulations.
///
/// Inbound datagrams larger than the size limit are discarded on receive
/// and counted as errors, like a truncated UDP read.
#[derive(Debug, Clone)]
pub struct InMemoryAdapter {
    inbound: VecDeque<Datagram>,
    sent: Vec<Datagram>,
    max_datagram_size: usize,
    closed: bool,
    health: TransportHealthSnapshot,
}

impl Default for InMemoryAdapter {
    fn default() -> Self {
        Self::with_max_datagram_size(usize::MAX)
    }
}

impl InMemoryAdapter {
    pub fn with_max_datagram_size(max_datagram_size: usize) -> Self {
        Self {
            inbound: VecDeque::new(),
            sent: Vec::new(),
            max_datagram_size,
            closed: false,
            health: TransportHealthSnapshot::default(),
        }
    }

    /// Queues bytes as if they arrived from `peer`.
    pub fn enqueue_inbound(&mut self, peer: impl Into<String>, bytes: Vec<u8>) {
        self.inbound.push_back(Datagram {
            peer: peer.into(),
            bytes,
        });
    }

    /// Number of inbound datagrams not yet received.
    pub fn pending_inbound(&self) -> usize {
        self.inbound.len()
    }

    /// Drains every datagram sent so far.
    pub fn take_sent(&mut self) -> Vec<Datagram> {
        std::mem::take(&mut self.sent)
    }

    /// A closed adapter fails every send.
    pub fn close(&mut self) {
        self.closed = true;
    }

    fn record_error(&mut self, err: &InMemoryError) {
        self.health.last_error = Some(err.to_string());
    }
}

impl TransportAdapter for InMemoryAdapter {
    type Peer = String;
    type Error = InMemoryError;

    fn send(&mut self, peer: &Self::Peer, bytes: &[u8]) -> Result<(), Self::Error> {
        let outcome = if self.closed {
            Err(InMemoryError::Closed)
        } else if bytes.len() > self.max_datagram_size {
            Err(InMemoryError::Oversize {
                len: bytes.len(),
                limit: self.max_datagram_size,
            })
        } else {
            Ok(())
        };

        match outcome {
            Ok(()) => {
                self.sent.push(Datagram {
                    peer: peer.clone(),
                    bytes: bytes.to_vec(),
                });
                self.health.outbound_send_ok += 1;
                Ok(())
            }
            Err(err) => {
                self.health.outbound_send_err += 1;
                self.record_error(&err);
                Err(err)
            }
        }
    }

    fn recv(&mut self) -> Option<(Self::Peer, Vec<u8>)> {
        while let Some(datagram) = self.inbound.pop_front() {
            if datagram.bytes.len() > self.max_datagram_size {
                self.health.inbound_errors += 1;
                let err = InMemoryError::Oversize {
                    len: datagram.bytes.len(),
                    limit: self.max_datagram_size,
                };
                self.record_error(&err);
                continue;
            }
            self.health.inbound_received += 1;
            return Some((datagram.peer, datagram.bytes));
        }
        None
    }

    fn health_snapshot(&self) -> TransportHealthSnapshot {
        self.health.clone()
    }
}
