//! Simulation time
//!
//! Fixed 60Hz tick rate; script updates receive the elapsed seconds per tick.

use std::time::Duration;

/// Elapsed simulation time handed to systems, in seconds.
pub type TimeDelta = f64;

/// Fixed simulation tick rate (60 Hz = 16.666ms per tick)
pub const TICK_RATE_HZ: u32 = 60;
pub const TICK_DURATION: Duration = Duration::from_micros(16_666); // ~16.666ms

/// Simulation time tracker
pub struct SimulationTime {
    tick_count: u64,
    accumulated_time: Duration,
}

impl SimulationTime {
    pub fn new() -> Self {
        Self {
            tick_count: 0,
            accumulated_time: Duration::ZERO,
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Advance one fixed tick and return its delta.
    pub fn advance_tick(&mut self) -> TimeDelta {
        self.tick_count += 1;
        self.accumulated_time += TICK_DURATION;
        TICK_DURATION.as_secs_f64()
    }

    pub fn total_time(&self) -> Duration {
        self.accumulated_time
    }
}

impl Default for SimulationTime {
    fn default() -> Self {
        Self::new()
    }
}
