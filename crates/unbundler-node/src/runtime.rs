//! Receive-loop helpers joining a transport adapter to a server.

use tracing::trace;
use unbundler_codec::DecodeError;
use unbundler_transport::adapter::TransportAdapter;

use crate::clock::Clock;
use crate::server::{RouteSummary, Server};

/// Receives at most one datagram from `adapter` and routes it.
///
/// `Ok(None)` means nothing was ready. A decode error has already been
/// counted and logged by the server.
pub fn pump_once<C, A>(
    server: &Server<C>,
    adapter: &mut A,
) -> Result<Option<RouteSummary>, DecodeError>
where
    C: Clock,
    A: TransportAdapter,
{
    let Some((_peer, bytes)) = adapter.recv() else {
        return Ok(None);
    };
    trace!(len = bytes.len(), "datagram received");
    server.on_datagram(&bytes).map(Some)
}

/// Drains up to `max` ready datagrams, skipping malformed ones.
pub fn pump_pending<C, A>(server: &Server<C>, adapter: &mut A, max: usize) -> RouteSummary
where
    C: Clock,
    A: TransportAdapter,
{
    let mut total = RouteSummary::default();
    for _ in 0..max {
        match pump_once(server, adapter) {
            Ok(Some(summary)) => total += summary,
            Ok(None) => break,
            Err(_) => continue,
        }
    }
    total
}
