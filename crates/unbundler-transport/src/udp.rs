//! UDP datagram adapter over `std::net::UdpSocket`.
//!
//! `recv` blocks for at most the configured read timeout so a receive loop
//! can poll a shutdown flag between datagrams.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::adapter::{TransportAdapter, TransportHealthSnapshot};

/// Largest UDP payload over IPv4.
pub const MAX_UDP_PAYLOAD: usize = 65_507;

#[derive(Debug, Clone)]
pub struct UdpAdapterConfig {
    pub bind: String,
    pub recv_timeout: Duration,
    pub max_datagram_size: usize,
}

impl UdpAdapterConfig {
    pub fn new(bind: impl Into<String>) -> Self {
        Self {
            bind: bind.into(),
            recv_timeout: Duration::from_millis(100),
            max_datagram_size: MAX_UDP_PAYLOAD,
        }
    }
}

#[derive(Debug, Error)]
pub enum UdpAdapterError {
    #[error("bind {addr} failed: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("socket configuration failed: {0}")]
    Configure(#[from] io::Error),
    #[error("receive timeout must be non-zero")]
    ZeroTimeout,
}

pub struct UdpAdapter {
    socket: UdpSocket,
    buf: Vec<u8>,
    send_ok: u64,
    send_err: u64,
    recv_ok: u64,
    recv_err: u64,
    last_error: Option<String>,
}

impl UdpAdapter {
    pub fn bind(config: &UdpAdapterConfig) -> Result<Self, UdpAdapterError> {
        if config.recv_timeout.is_zero() {
            return Err(UdpAdapterError::ZeroTimeout);
        }
        let socket = UdpSocket::bind(&config.bind).map_err(|source| UdpAdapterError::Bind {
            addr: config.bind.clone(),
            source,
        })?;
        socket.set_read_timeout(Some(config.recv_timeout))?;
        Ok(Self {
            socket,
            buf: vec![0_u8; config.max_datagram_size.max(1)],
            send_ok: 0,
            send_err: 0,
            recv_ok: 0,
            recv_err: 0,
            last_error: None,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl TransportAdapter for UdpAdapter {
    type Peer = SocketAddr;
    type Error = io::Error;

    fn send(&mut self, peer: &Self::Peer, bytes: &[u8]) -> Result<(), Self::Error> {
        match self.socket.send_to(bytes, peer) {
            Ok(_) => {
                self.send_ok += 1;
                Ok(())
            }
            Err(err) => {
                self.send_err += 1;
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    fn recv(&mut self) -> Option<(Self::Peer, Vec<u8>)> {
        match self.socket.recv_from(&mut self.buf) {
            Ok((len, from)) => {
                self.recv_ok += 1;
                Some((from, self.buf[..len].to_vec()))
            }
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                None
            }
            Err(err) => {
                warn!("udp recv failed: {err}");
                self.recv_err += 1;
                self.last_error = Some(err.to_string());
                None
            }
        }
    }

    fn health_snapshot(&self) -> TransportHealthSnapshot {
        TransportHealthSnapshot {
            outbound_send_ok: self.send_ok,
            outbound_send_err: self.send_err,
            inbound_received: self.recv_ok,
            inbound_errors: self.recv_err,
            last_error: self.last_error.clone(),
        }
    }
}
