use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use unbundler_codec::{encode_message, Argument, EncodeError, Message};
use unbundler_node::dispatcher::HandlerError;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("resolve target {addr} failed: {source}")]
    Resolve {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("target {0} resolved to no address")]
    NoAddress(String),
    #[error("open relay socket failed: {0}")]
    Socket(#[source] io::Error),
    #[error("encode relayed message failed: {0}")]
    Encode(#[from] EncodeError),
    #[error("send to {target} failed: {source}")]
    Send {
        target: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// UDP sender connected to the relay target.
#[derive(Debug)]
pub struct RelayClient {
    socket: UdpSocket,
    target: SocketAddr,
}

impl RelayClient {
    pub fn connect(target: &str) -> Result<Self, RelayError> {
        let target_addr = target
            .to_socket_addrs()
            .map_err(|source| RelayError::Resolve {
                addr: target.to_string(),
                source,
            })?
            .next()
            .ok_or_else(|| RelayError::NoAddress(target.to_string()))?;

        let bind = if target_addr.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(bind).map_err(RelayError::Socket)?;
        socket.connect(target_addr).map_err(RelayError::Socket)?;
        Ok(Self {
            socket,
            target: target_addr,
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Sends `address` with only the first of `args` (or none).
    pub fn forward(&self, address: &str, args: &[Argument]) -> Result<usize, RelayError> {
        let message = Message::new(address, args.first().cloned().into_iter().collect());
        let bytes = encode_message(&message)?;
        self.socket.send(&bytes).map_err(|source| RelayError::Send {
            target: self.target,
            source,
        })
    }
}

/// Dispatcher handler that logs each matching message and forwards it.
pub fn relay_handler(
    client: Arc<RelayClient>,
) -> impl Fn(&str, &[Argument]) -> Result<(), HandlerError> + Send + Sync + 'static {
    move |address: &str, args: &[Argument]| {
        let rendered: Vec<String> = args.iter().map(ToString::to_string).collect();
        info!(address, args = ?rendered, "relaying");
        client
            .forward(address, args)
            .map(|_| ())
            .map_err(HandlerError::failed)
    }
}

#[cfg(test)]
mod tests {
    use std::net::UdpSocket;
    use std::sync::Arc;
    use std::time::Duration;

    use unbundler_codec::{decode_message, Argument};

    use super::{relay_handler, RelayClient, RelayError};

    fn listener() -> (UdpSocket, String) {
        let socket = UdpSocket::bind("127.0.0.1:0").expect("bind listener");
        socket
            .set_read_timeout(Some(Duration::from_secs(2)))
            .expect("read timeout");
        let addr = socket.local_addr().expect("listener addr").to_string();
        (socket, addr)
    }

    fn receive(socket: &UdpSocket) -> Vec<u8> {
        let mut buf = [0_u8; 1024];
        let (len, _) = socket.recv_from(&mut buf).expect("relayed datagram");
        buf[..len].to_vec()
    }

    #[test]
    fn forward_keeps_only_the_first_argument() {
        let (socket, addr) = listener();
        let client = RelayClient::connect(&addr).expect("connect");

        client
            .forward("/ardosc/1", &[Argument::Int(42), Argument::from("on")])
            .expect("send");

        let relayed = decode_message(&receive(&socket)).expect("relayed message decodes");
        assert_eq!(relayed.address, "/ardosc/1");
        assert_eq!(relayed.args, vec![Argument::Int(42)]);
    }

    #[test]
    fn forward_without_arguments_sends_bare_message() {
        let (socket, addr) = listener();
        let client = RelayClient::connect(&addr).expect("connect");
        client.forward("/ardosc/ping", &[]).expect("send");

        let relayed = decode_message(&receive(&socket)).expect("relayed message decodes");
        assert!(relayed.args.is_empty());
    }

    #[test]
    fn handler_reports_encode_failures() {
        let (_socket, addr) = listener();
        let handler = relay_handler(Arc::new(RelayClient::connect(&addr).expect("connect")));
        let err = handler("no-slash", &[]).expect_err("invalid address must fail");
        assert!(err.to_string().contains("encode"));
    }

    #[test]
    fn unresolvable_target_is_an_error() {
        assert!(matches!(
            RelayClient::connect("not an address"),
            Err(RelayError::Resolve { .. })
        ));
    }
}
