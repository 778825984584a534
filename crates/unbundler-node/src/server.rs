use std::ops::AddAssign;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};
use unbundler_codec::{
    decode_packet, Argument, Bundle, DecodeError, Message, NtpTime, Packet, Timetag,
};

use crate::clock::{Clock, SystemClock};
use crate::config::ServerConfig;
use crate::dispatcher::{Dispatcher, HandlerError};
use crate::pattern::{AddressMatcher, PatternError};
use crate::queue::TimeQueue;

/// Work done while routing one packet or one tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RouteSummary {
    /// Messages handed to the dispatcher.
    pub dispatched: usize,
    /// Bundles placed on the release queue.
    pub scheduled: usize,
    /// Bundles taken off the release queue.
    pub released: usize,
    /// Handler invocations that failed or panicked.
    pub handler_failures: usize,
}

impl AddAssign for RouteSummary {
    fn add_assign(&mut self, rhs: Self) {
        self.dispatched += rhs.dispatched;
        self.scheduled += rhs.scheduled;
        self.released += rhs.released;
        self.handler_failures += rhs.handler_failures;
    }
}

/// Cumulative server counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ServerStats {
    pub datagrams: u64,
    pub decode_errors: u64,
    pub messages_dispatched: u64,
    pub handler_failures: u64,
    pub bundles_scheduled: u64,
    pub bundles_released: u64,
}

#[derive(Debug, Default)]
struct StatsInner {
    datagrams: AtomicU64,
    decode_errors: AtomicU64,
    messages_dispatched: AtomicU64,
    handler_failures: AtomicU64,
    bundles_scheduled: AtomicU64,
    bundles_released: AtomicU64,
}

impl StatsInner {
    fn record(&self, summary: &RouteSummary) {
        self.messages_dispatched
            .fetch_add(summary.dispatched as u64, Ordering::Relaxed);
        self.handler_failures
            .fetch_add(summary.handler_failures as u64, Ordering::Relaxed);
        self.bundles_scheduled
            .fetch_add(summary.scheduled as u64, Ordering::Relaxed);
        self.bundles_released
            .fetch_add(summary.released as u64, Ordering::Relaxed);
    }
}

/// Routes decoded packets to the dispatcher or the release queue.
///
/// All methods take `&self`; share one server as `Arc<Server<C>>` between
/// the receive loop and the ticker.
#[derive(Debug)]
pub struct Server<C = SystemClock> {
    dispatcher: Dispatcher,
    queue: TimeQueue,
    clock: C,
    config: ServerConfig,
    stats: StatsInner,
}

impl Server<SystemClock> {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> Server<C> {
    pub fn with_clock(config: ServerConfig, clock: C) -> Self {
        Self {
            dispatcher: Dispatcher::new(),
            queue: TimeQueue::new(),
            clock,
            config,
            stats: StatsInner::default(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn queue(&self) -> &TimeQueue {
        &self.queue
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn add_pattern<M, F>(&self, matcher: M, handler: F)
    where
        M: AddressMatcher + 'static,
        F: Fn(&str, &[Argument]) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.dispatcher.add_pattern(matcher, handler);
    }

    pub fn add_pattern_str<F>(&self, pattern: &str, handler: F) -> Result<(), PatternError>
    where
        F: Fn(&str, &[Argument]) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.dispatcher.add_pattern_str(pattern, handler)
    }

    pub fn remove_pattern(&self, pattern: &str) -> usize {
        self.dispatcher.remove_pattern(pattern)
    }

    /// Receive entry point for one raw datagram.
    ///
    /// Malformed datagrams are counted, logged and dropped; the error is
    /// returned for the caller's information only.
    pub fn on_datagram(&self, bytes: &[u8]) -> Result<RouteSummary, DecodeError> {
        self.stats.datagrams.fetch_add(1, Ordering::Relaxed);
        match decode_packet(bytes) {
            Ok(packet) => Ok(self.route(packet)),
            Err(err) => {
                self.stats.decode_errors.fetch_add(1, Ordering::Relaxed);
                warn!(len = bytes.len(), "bad data received: {err}");
                Err(err)
            }
        }
    }

    /// Dispatches a message, unbundles an immediate bundle, or schedules a
    /// timetagged bundle.
    pub fn route(&self, packet: Packet) -> RouteSummary {
        let mut summary = RouteSummary::default();
        match packet {
            Packet::Message(message) => self.dispatch_message(&message, &mut summary),
            Packet::Bundle(bundle) => match bundle.timetag {
                Timetag::Immediate => self.unbundle(bundle, &mut summary),
                Timetag::At(at) => self.schedule(bundle, at, &mut summary),
            },
        }
        self.stats.record(&summary);
        summary
    }

    /// Releases every bundle due at the clock's current time and dispatches
    /// its contents.
    pub fn tick(&self) -> RouteSummary {
        let now = self.clock.now();
        let mut summary = RouteSummary::default();

        for _ in 0..self.config.max_release_passes.max(1) {
            let due = self.queue.release_due(now);
            if due.is_empty() {
                break;
            }
            debug!(count = due.len(), %now, "releasing scheduled bundles");
            for bundle in due {
                summary.released += 1;
                self.unbundle(bundle, &mut summary);
            }
        }

        self.stats.record(&summary);
        summary
    }

    pub fn stats(&self) -> ServerStats {
        ServerStats {
            datagrams: self.stats.datagrams.load(Ordering::Relaxed),
            decode_errors: self.stats.decode_errors.load(Ordering::Relaxed),
            messages_dispatched: self.stats.messages_dispatched.load(Ordering::Relaxed),
            handler_failures: self.stats.handler_failures.load(Ordering::Relaxed),
            bundles_scheduled: self.stats.bundles_scheduled.load(Ordering::Relaxed),
            bundles_released: self.stats.bundles_released.load(Ordering::Relaxed),
        }
    }

    /// Pre-order walk: messages are dispatched, immediate sub-bundles are
    /// walked in place, timetagged sub-bundles go back on the queue.
    fn unbundle(&self, bundle: Bundle, summary: &mut RouteSummary) {
        for element in bundle.elements {
            match element {
                Packet::Message(message) => self.dispatch_message(&message, summary),
                Packet::Bundle(nested) => match nested.timetag {
                    Timetag::Immediate => self.unbundle(nested, summary),
                    Timetag::At(at) => self.schedule(nested, at, summary),
                },
            }
        }
    }

    fn schedule(&self, bundle: Bundle, at: NtpTime, summary: &mut RouteSummary) {
        debug!(%at, messages = bundle.message_count(), "scheduling bundle");
        self.queue.enqueue(bundle, at);
        summary.scheduled += 1;
    }

    fn dispatch_message(&self, message: &Message, summary: &mut RouteSummary) {
        let report = self.dispatcher.dispatch(message);
        summary.dispatched += 1;
        summary.handler_failures += report.failures.len();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use unbundler_codec::{
        encode_packet, Argument, Bundle, DecodeError, Message, NtpTime, Packet, Timetag,
    };

    use super::{RouteSummary, Server};
    use crate::clock::ManualClock;
    use crate::config::ServerConfig;
    use crate::dispatcher::HandlerError;

    type Seen = Arc<Mutex<Vec<String>>>;

    fn start() -> NtpTime {
        NtpTime::from_parts(3_950_000_000, 0)
    }

    fn server_with_log() -> (Server<ManualClock>, Seen) {
        let server = Server::with_clock(ServerConfig::default(), ManualClock::new(start()));
        let seen: Seen = Arc::default();
        let log = Arc::clone(&seen);
        server
            .add_pattern_str("/*", move |address, _| {
                log.lock().unwrap().push(address.to_string());
                Ok(())
            })
            .expect("pattern should parse");
        (server, seen)
    }

    fn msg(address: &str) -> Packet {
        Packet::Message(Message::new(address, vec![Argument::Int(1)]))
    }

    fn at(offset_secs: u64) -> Timetag {
        Timetag::At(start().saturating_add(Duration::from_secs(offset_secs)))
    }

    #[test]
    fn immediate_bundle_is_flattened_pre_order() {
        let (server, seen) = server_with_log();
        let bundle = Bundle::new(
            Timetag::Immediate,
            vec![
                msg("/1"),
                Packet::Bundle(Bundle::new(Timetag::Immediate, vec![msg("/2"), msg("/3")])),
                msg("/4"),
            ],
        );

        let summary = server.route(Packet::Bundle(bundle));
        assert_eq!(summary.dispatched, 4);
        assert_eq!(summary.scheduled, 0);
        assert_eq!(*seen.lock().unwrap(), vec!["/1", "/2", "/3", "/4"]);
    }

    #[test]
    fn timetagged_bundle_waits_for_its_instant() {
        let (server, seen) = server_with_log();
        let summary = server.route(Packet::Bundle(Bundle::new(at(10), vec![msg("/later")])));
        assert_eq!(summary.scheduled, 1);
        assert_eq!(server.tick(), RouteSummary::default());
        assert!(seen.lock().unwrap().is_empty());

        server.clock().advance(Duration::from_secs(11));
        let summary = server.tick();
        assert_eq!(summary.released, 1);
        assert_eq!(summary.dispatched, 1);
        assert_eq!(*seen.lock().unwrap(), vec!["/later"]);
        assert!(server.queue().is_empty());
    }

    #[test]
    fn nested_timetag_inside_immediate_bundle_is_scheduled() {
        let (server, seen) = server_with_log();
        let bundle = Bundle::new(
            Timetag::Immediate,
            vec![
                msg("/now"),
                Packet::Bundle(Bundle::new(at(5), vec![msg("/soon")])),
            ],
        );
        let summary = server.route(Packet::Bundle(bundle));
        assert_eq!(summary.dispatched, 1);
        assert_eq!(summary.scheduled, 1);

        server.clock().advance(Duration::from_secs(5));
        server.tick();
        assert_eq!(*seen.lock().unwrap(), vec!["/now", "/soon"]);
    }

    #[test]
    fn released_bundle_requeues_its_nested_timetags() {
        let (server, seen) = server_with_log();
        let bundle = Bundle::new(
            at(1),
            vec![
                msg("/outer"),
                Packet::Bundle(Bundle::new(at(30), vec![msg("/inner-late")])),
                Packet::Bundle(Bundle::new(at(0), vec![msg("/inner-past")])),
            ],
        );
        server.route(Packet::Bundle(bundle));

        server.clock().advance(Duration::from_secs(2));
        let summary = server.tick();
        // Outer bundle plus the already-due inner one, in the same tick.
        assert_eq!(summary.released, 2);
        assert_eq!(summary.scheduled, 2);
        assert_eq!(*seen.lock().unwrap(), vec!["/outer", "/inner-past"]);
        assert_eq!(server.queue().len(), 1);
    }

    #[test]
    fn malformed_datagram_is_counted_and_dropped() {
        let (server, seen) = server_with_log();
        let err = server
            .on_datagram(b"/bad")
            .expect_err("unterminated address must fail");
        assert_eq!(err, DecodeError::UnterminatedString { offset: 0 });

        let good = encode_packet(&msg("/ok")).expect("message should encode");
        server.on_datagram(&good).expect("valid datagram should route");

        let stats = server.stats();
        assert_eq!(stats.datagrams, 2);
        assert_eq!(stats.decode_errors, 1);
        assert_eq!(stats.messages_dispatched, 1);
        assert_eq!(*seen.lock().unwrap(), vec!["/ok"]);
    }

    #[test]
    fn handler_failures_are_counted_without_stopping_routing() {
        let (server, seen) = server_with_log();
        server
            .add_pattern_str("/fail", |_, _| Err(HandlerError::failed("nope")))
            .expect("pattern");

        let summary = server.route(msg("/fail"));
        assert_eq!(summary.handler_failures, 1);
        server.route(msg("/next"));
        assert_eq!(*seen.lock().unwrap(), vec!["/fail", "/next"]);
        assert_eq!(server.stats().handler_failures, 1);
    }

    #[test]
    fn remove_pattern_stops_delivery() {
        let (server, seen) = server_with_log();
        assert_eq!(server.remove_pattern("/*"), 1);
        server.route(msg("/gone"));
        assert!(seen.lock().unwrap().is_empty());
    }
}
