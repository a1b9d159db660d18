use serde::Serialize;

use crate::{core::Ticks, error::ConfigError};

/// Quantum handed to a thread each time it is dispatched.
pub const DEFAULT_TIME_SLICE: u32 = 4;

pub const DEFAULT_MAX_TICKS: Ticks = 10_000;

/// Simulated timer frequency; one "second" is this many ticks.
pub const TIMER_FREQ: Ticks = 100;

// Declared I/O durations are clamped into this range so every I/O is
// observable and none blocks pathologically long.
pub const MIN_IO_DURATION: Ticks = 8;
pub const MAX_IO_DURATION: Ticks = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SimConfig {
    pub time_slice: u32,
    pub max_ticks: Ticks,
    /// Keep the per-tick snapshot trace. Metrics do not need it.
    pub record_trace: bool,
}

impl SimConfig {
    pub fn new(time_slice: u32, max_ticks: Ticks) -> Self {
        Self {
            time_slice,
            max_ticks,
            record_trace: true,
        }
    }

    pub fn with_max_ticks(mut self, max_ticks: Ticks) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    pub fn without_trace(mut self) -> Self {
        self.record_trace = false;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.time_slice == 0 {
            return Err(ConfigError::ZeroTimeSlice);
        }
        Ok(())
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_SLICE, DEFAULT_MAX_TICKS)
    }
}

/// Clamp a declared I/O duration. Zero means the thread never blocks.
pub fn clamp_io_duration(raw: Ticks) -> Ticks {
    if raw == 0 {
        return 0;
    }
    raw.clamp(MIN_IO_DURATION, MAX_IO_DURATION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_duration_is_clamped() {
        assert_eq!(clamp_io_duration(0), 0);
        assert_eq!(clamp_io_duration(5), 8);
        assert_eq!(clamp_io_duration(50), 50);
        assert_eq!(clamp_io_duration(300), 120);
    }

    #[test]
    fn zero_time_slice_is_rejected() {
        let config = SimConfig::new(0, 100);
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeSlice));
        assert!(SimConfig::default().validate().is_ok());
    }
}
