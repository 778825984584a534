use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Cadence of the periodic release tick.
    pub tick_interval: Duration,
    /// Upper bound on release passes in one tick. Nested bundles whose own
    /// timetag is already due are released on a follow-up pass.
    pub max_release_passes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(2),
            max_release_passes: 64,
        }
    }
}

impl ServerConfig {
    pub fn with_tick_interval(tick_interval: Duration) -> Self {
        Self {
            tick_interval,
            ..Self::default()
        }
    }
}
