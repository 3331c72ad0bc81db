//! Time management for the simulation
//!
//! The simulation operates in discrete ticks of a fixed real-time duration.
//! Consecutive ticks are aggregated into minute buckets for reporting.
//! This module provides deterministic time advancement and the tick-to-minute
//! conversion used by the metrics layer.

use serde::{Deserialize, Serialize};

/// Convert a tick number to its minute-bucket index.
///
/// `minute = floor(tick * tick_interval_secs / 60)`.
///
/// # Example
/// ```
/// use cep_simulator_core_rs::core::time::minute_of;
///
/// // 0.1s per tick => 600 ticks per minute bucket boundary at tick 600
/// assert_eq!(minute_of(0, 0.1), 0);
/// assert_eq!(minute_of(599, 0.1), 0);
/// assert_eq!(minute_of(600, 0.1), 1);
/// ```
pub fn minute_of(tick: u64, tick_interval_secs: f64) -> u64 {
    (tick as f64 * tick_interval_secs / 60.0).floor() as u64
}

/// Manages simulation time in discrete ticks
///
/// # Example
/// ```
/// use cep_simulator_core_rs::TimeManager;
///
/// let mut time = TimeManager::new(0.1); // 0.1 seconds per tick
/// assert_eq!(time.current_tick(), 0);
/// assert_eq!(time.minute_index(), 0);
///
/// time.advance_tick();
/// assert_eq!(time.current_tick(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeManager {
    /// Total ticks elapsed since simulation start
    current_tick: u64,
    /// Real-time duration of one tick, in seconds
    tick_interval_secs: f64,
}

impl TimeManager {
    /// Create a new TimeManager
    ///
    /// # Arguments
    /// * `tick_interval_secs` - Duration of one tick in seconds (must be positive)
    pub fn new(tick_interval_secs: f64) -> Self {
        assert!(
            tick_interval_secs > 0.0,
            "tick_interval_secs must be positive"
        );
        Self {
            current_tick: 0,
            tick_interval_secs,
        }
    }

    /// Advance time by one tick
    pub fn advance_tick(&mut self) {
        self.current_tick += 1;
    }

    /// Get the current tick (total ticks since start)
    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    /// Get the minute bucket the current tick falls into
    pub fn minute_index(&self) -> u64 {
        minute_of(self.current_tick, self.tick_interval_secs)
    }

    /// Get the tick interval in seconds
    pub fn tick_interval_secs(&self) -> f64 {
        self.tick_interval_secs
    }

    /// Get elapsed simulated time in seconds
    pub fn elapsed_secs(&self) -> f64 {
        self.current_tick as f64 * self.tick_interval_secs
    }
}
