use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::dispatcher::panic_message;
use crate::server::Server;

/// Handle to the periodic release thread. Dropping it stops the thread.
#[derive(Debug)]
pub struct Ticker {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    ticks: Arc<AtomicU64>,
}

/// Starts a thread that calls [`Server::tick`] every `interval`.
pub fn spawn_ticker<C>(server: Arc<Server<C>>, interval: Duration) -> io::Result<Ticker>
where
    C: Clock + 'static,
{
    let (stop_tx, stop_rx) = mpsc::channel::<()>();
    let ticks = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&ticks);
    let interval = interval.max(Duration::from_micros(100));

    let handle = thread::Builder::new()
        .name("unbundler-ticker".to_string())
        .spawn(move || {
            info!(interval = ?interval, "release ticker started");
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let summary = server.tick();
                        if summary.released > 0 {
                            debug!(
                                released = summary.released,
                                dispatched = summary.dispatched,
                                "tick released bundles"
                            );
                        }
                        counter.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            info!("release ticker stopped");
        })?;

    Ok(Ticker {
        stop_tx: Some(stop_tx),
        handle: Some(handle),
        ticks,
    })
}

impl Ticker {
    /// Number of completed ticks.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Signals the thread and waits for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(payload) = handle.join() {
                warn!("release ticker panicked: {}", panic_message(&*payload));
            }
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
