use std::collections::BTreeMap;
use std::sync::Mutex;

use unbundler_codec::{Bundle, NtpTime};

#[derive(Debug, Default)]
struct Inner {
    pending: BTreeMap<(NtpTime, u64), Bundle>,
    next_seq: u64,
}

/// Pending scheduled bundles ordered by release instant.
///
/// Safe to share between a receive path calling [`TimeQueue::enqueue`] and
/// a ticker calling [`TimeQueue::release_due`].
#[derive(Debug, Default)]
pub struct TimeQueue {
    inner: Mutex<Inner>,
}

impl TimeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `bundle` for release at `at`. No dedup, no capacity bound.
    pub fn enqueue(&self, bundle: Bundle, at: NtpTime) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.pending.insert((at, seq), bundle);
    }

    /// Removes and returns every bundle due at or before `now`, in the order
    /// they were enqueued.
    pub fn release_due(&self, now: NtpTime) -> Vec<Bundle> {
        let mut due = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            let later = match now.to_bits().checked_add(1) {
                Some(bits) => inner.pending.split_off(&(NtpTime::from_bits(bits), 0)),
                None => BTreeMap::new(),
            };
            std::mem::replace(&mut inner.pending, later)
        }
        .into_iter()
        .map(|((_, seq), bundle)| (seq, bundle))
        .collect::<Vec<_>>();

        due.sort_unstable_by_key(|(seq, _)| *seq);
        due.into_iter().map(|(_, bundle)| bundle).collect()
    }

    /// Earliest pending release instant.
    pub fn next_due(&self) -> Option<NtpTime> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.pending.keys().next().map(|(at, _)| *at)
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pending
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
