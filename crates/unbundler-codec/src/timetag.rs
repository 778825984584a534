use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Seconds between the NTP era (1900-01-01) and the Unix epoch.
pub const NTP_UNIX_OFFSET_SECS: u64 = 2_208_988_800;

/// Raw timetag bits reserved for "dispatch immediately".
pub const IMMEDIATE_BITS: u64 = 1;

/// 64-bit NTP fixed-point instant: high 32 bits whole seconds since 1900,
/// low 32 bits a binary fraction of a second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NtpTime(u64);

impl NtpTime {
    /// Earliest representable instant.
    pub const ZERO: NtpTime = NtpTime(0);

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn from_parts(seconds: u32, fraction: u32) -> Self {
        Self(((seconds as u64) << 32) | fraction as u64)
    }

    pub const fn to_bits(self) -> u64 {
        self.0
    }

    pub const fn seconds(self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub const fn fraction(self) -> u32 {
        self.0 as u32
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Converts a wall-clock instant, saturating outside the NTP era.
    pub fn from_system_time(time: SystemTime) -> Self {
        let unix_offset = duration_to_bits(Duration::from_secs(NTP_UNIX_OFFSET_SECS));
        match time.duration_since(UNIX_EPOCH) {
            Ok(since_unix) => Self(unix_offset.saturating_add(duration_to_bits(since_unix))),
            Err(before_unix) => {
                Self(unix_offset.saturating_sub(duration_to_bits(before_unix.duration())))
            }
        }
    }

    /// Converts back to a wall-clock instant.
    ///
    /// The fraction is rounded to the nearest nanosecond.
    pub fn to_system_time(self) -> SystemTime {
        let since_era = bits_to_duration(self.0);
        let offset = Duration::from_secs(NTP_UNIX_OFFSET_SECS);
        if since_era >= offset {
            UNIX_EPOCH + (since_era - offset)
        } else {
            UNIX_EPOCH - (offset - since_era)
        }
    }

    pub fn saturating_add(self, delta: Duration) -> Self {
        Self(self.0.saturating_add(duration_to_bits(delta)))
    }

    pub fn saturating_sub(self, delta: Duration) -> Self {
        Self(self.0.saturating_sub(duration_to_bits(delta)))
    }

    /// Time elapsed from `earlier` to `self`, zero when `earlier` is later.
    pub fn saturating_duration_since(self, earlier: NtpTime) -> Duration {
        bits_to_duration(self.0.saturating_sub(earlier.0))
    }
}

impl From<SystemTime> for NtpTime {
    fn from(time: SystemTime) -> Self {
        Self::from_system_time(time)
    }
}

impl From<NtpTime> for SystemTime {
    fn from(time: NtpTime) -> Self {
        time.to_system_time()
    }
}

impl fmt::Display for NtpTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:08x}", self.seconds(), self.fraction())
    }
}

fn duration_to_bits(d: Duration) -> u64 {
    let secs = d.as_secs().min(u32::MAX as u64);
    let frac = ((d.subsec_nanos() as u64) << 32) / 1_000_000_000;
    (secs << 32) | frac
}

fn bits_to_duration(bits: u64) -> Duration {
    let secs = bits >> 32;
    let frac = bits & 0xFFFF_FFFF;
    let nanos = (frac * 1_000_000_000 + (1 << 31)) >> 32;
    Duration::from_secs(secs) + Duration::from_nanos(nanos)
}

/// Bundle release time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timetag {
    /// Dispatch as soon as received.
    Immediate,
    /// Dispatch no earlier than the given instant.
    At(NtpTime),
}

impl Timetag {
    /// Interprets raw wire bits; only `IMMEDIATE_BITS` means immediate.
    pub const fn from_bits(bits: u64) -> Self {
        if bits == IMMEDIATE_BITS {
            Timetag::Immediate
        } else {
            Timetag::At(NtpTime::from_bits(bits))
        }
    }

    pub const fn to_bits(self) -> u64 {
        match self {
            Timetag::Immediate => IMMEDIATE_BITS,
            Timetag::At(t) => t.to_bits(),
        }
    }

    pub fn is_immediate(&self) -> bool {
        matches!(self, Timetag::Immediate)
    }

    /// Release instant, or `None` for immediate bundles.
    pub fn instant(&self) -> Option<NtpTime> {
        match self {
            Timetag::Immediate => None,
            Timetag::At(t) => Some(*t),
        }
    }
}

impl Default for Timetag {
    fn default() -> Self {
        Timetag::Immediate
    }
}

impl From<SystemTime> for Timetag {
    fn from(time: SystemTime) -> Self {
        Timetag::At(NtpTime::from_system_time(time))
    }
}
