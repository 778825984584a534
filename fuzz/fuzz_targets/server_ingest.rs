#![no_main]

use std::time::Duration;

use libfuzzer_sys::fuzz_target;
use unbundler_codec::NtpTime;
use unbundler_node::clock::ManualClock;
use unbundler_node::config::ServerConfig;
use unbundler_node::runtime::pump_pending;
use unbundler_node::server::Server;
use unbundler_transport::adapter::InMemoryAdapter;

fuzz_target!(|data: &[u8]| {
    let server = Server::with_clock(
        ServerConfig::default(),
        ManualClock::new(NtpTime::from_parts(3_950_000_000, 0)),
    );
    let _ = server.add_pattern_str("/*", |_, _| Ok(()));

    let mut adapter = InMemoryAdapter::default();
    adapter.enqueue_inbound("sender", data.to_vec());
    pump_pending(&server, &mut adapter, 1);

    server.clock().advance(Duration::from_secs(3600));
    server.tick();
});
