use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use unbundler_codec::NtpTime;

/// Time source used to decide which scheduled bundles are due.
pub trait Clock: Send + Sync {
    fn now(&self) -> NtpTime;
}

/// Wall-clock time from `SystemTime::now`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NtpTime {
        NtpTime::now()
    }
}

/// Manually driven clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    bits: AtomicU64,
}

impl ManualClock {
    pub fn new(start: NtpTime) -> Self {
        Self {
            bits: AtomicU64::new(start.to_bits()),
        }
    }

    pub fn set(&self, now: NtpTime) {
        self.bits.store(now.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, delta: Duration) {
        let next = self.now().saturating_add(delta);
        self.set(next);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NtpTime {
        NtpTime::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> NtpTime {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use unbundler_codec::NtpTime;

    use super::{Clock, ManualClock, SystemClock};

    #[test]
    fn manual_clock_advances_by_duration() {
        let clock = ManualClock::new(NtpTime::from_parts(100, 0));
        clock.advance(Duration::from_millis(500));
        assert_eq!(clock.now(), NtpTime::from_parts(100, 0x8000_0000));
    }

    #[test]
    fn system_clock_is_past_the_unix_epoch() {
        let seconds = SystemClock.now().seconds() as u64;
        assert!(seconds > unbundler_codec::timetag::NTP_UNIX_OFFSET_SECS);
    }
}
