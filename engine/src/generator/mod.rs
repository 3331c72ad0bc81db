//! Event generation for producer vertices.
//!
//! Producers do not receive events from upstream edges; instead, an event
//! generator decides how many new events arrive at the producer on each tick.
//! All generation is deterministic: the uniform and trace generators carry no
//! randomness at all, and the Poisson generator samples through a seeded
//! [`RngManager`](crate::rng::RngManager).
//!
//! # Key Principles
//!
//! 1. **Determinism**: same configuration → same per-tick count sequence
//! 2. **Config/instance split**: the serializable [`GeneratorConfig`] lives on
//!    the immutable query graph; the stateful generator instance is built into
//!    the mutable runtime state when a run starts
//! 3. **Infinite by construction**: generators never run out — a run asks for
//!    exactly one count per elapsed tick for the query's declared duration
//!
//! # Example
//!
//! ```
//! use cep_simulator_core_rs::generator::GeneratorConfig;
//!
//! let config = GeneratorConfig::Uniform { rate: 100 };
//! let mut generator = config.build();
//! assert_eq!(generator.events_for_tick(0), 100);
//! assert_eq!(generator.events_for_tick(1), 100);
//! ```

use crate::rng::RngManager;
use serde::{Deserialize, Serialize};

/// Configuration for a producer's event generator.
///
/// Stored on the Producer vertex; `build()` instantiates the runtime
/// generator when a simulation run starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GeneratorConfig {
    /// Fixed event count per tick (steady sensor-like load).
    ///
    /// Over T ticks generates exactly `rate * T` events.
    Uniform { rate: u64 },

    /// Poisson-distributed count per tick (bursty load).
    ///
    /// Deterministic given the seed; the mean must be non-negative.
    Poisson { mean_rate: f64, seed: u64 },

    /// Replay of a recorded per-tick count sequence.
    ///
    /// Wraps around when the sequence is exhausted, so the generator stays
    /// infinite. The sequence must be non-empty.
    Trace { counts: Vec<u64> },
}

impl GeneratorConfig {
    /// Instantiate the runtime generator for this configuration.
    ///
    /// # Panics
    /// Panics for `Trace` with an empty count sequence or `Poisson` with a
    /// negative mean.
    pub fn build(&self) -> Box<dyn EventGenerator> {
        match self {
            GeneratorConfig::Uniform { rate } => Box::new(UniformGenerator::new(*rate)),
            GeneratorConfig::Poisson { mean_rate, seed } => {
                Box::new(PoissonGenerator::new(*mean_rate, *seed))
            }
            GeneratorConfig::Trace { counts } => Box::new(TraceGenerator::new(counts.clone())),
        }
    }
}

/// Produces an event-arrival count for each tick.
///
/// Implementations may keep internal state (RNG, trace cursor); the schedule
/// and executor layers never depend on which variant is in use.
pub trait EventGenerator: Send {
    /// Number of events arriving at the producer on tick `tick`.
    ///
    /// Called exactly once per elapsed tick while the owning query is active.
    fn events_for_tick(&mut self, tick: u64) -> u64;
}

/// Fixed-rate generator: the same count every tick.
#[derive(Debug, Clone)]
pub struct UniformGenerator {
    rate: u64,
}

impl UniformGenerator {
    pub fn new(rate: u64) -> Self {
        Self { rate }
    }
}

impl EventGenerator for UniformGenerator {
    fn events_for_tick(&mut self, _tick: u64) -> u64 {
        self.rate
    }
}

/// Poisson generator: bursty arrivals with a configured mean rate.
#[derive(Debug, Clone)]
pub struct PoissonGenerator {
    mean_rate: f64,
    rng: RngManager,
}

impl PoissonGenerator {
    pub fn new(mean_rate: f64, seed: u64) -> Self {
        assert!(mean_rate >= 0.0, "mean_rate must be non-negative");
        Self {
            mean_rate,
            rng: RngManager::new(seed),
        }
    }
}

impl EventGenerator for PoissonGenerator {
    fn events_for_tick(&mut self, _tick: u64) -> u64 {
        self.rng.poisson(self.mean_rate)
    }
}

/// Trace-replay generator: cycles through a recorded count sequence.
#[derive(Debug, Clone)]
pub struct TraceGenerator {
    counts: Vec<u64>,
}

impl TraceGenerator {
    pub fn new(counts: Vec<u64>) -> Self {
        assert!(!counts.is_empty(), "trace counts must be non-empty");
        Self { counts }
    }
}

impl EventGenerator for TraceGenerator {
    fn events_for_tick(&mut self, tick: u64) -> u64 {
        self.counts[(tick % self.counts.len() as u64) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_is_exact() {
        let mut generator = GeneratorConfig::Uniform { rate: 7 }.build();
        let total: u64 = (0..100).map(|t| generator.events_for_tick(t)).sum();
        assert_eq!(total, 700);
    }

    #[test]
    fn test_trace_wraps_around() {
        let mut generator = GeneratorConfig::Trace {
            counts: vec![1, 2, 3],
        }
        .build();
        let seq: Vec<u64> = (0..7).map(|t| generator.events_for_tick(t)).collect();
        assert_eq!(seq, vec![1, 2, 3, 1, 2, 3, 1]);
    }

    #[test]
    #[should_panic(expected = "trace counts must be non-empty")]
    fn test_empty_trace_panics() {
        TraceGenerator::new(vec![]);
    }

    #[test]
    fn test_poisson_same_seed_same_sequence() {
        let config = GeneratorConfig::Poisson {
            mean_rate: 5.0,
            seed: 42,
        };
        let mut a = config.build();
        let mut b = config.build();
        for t in 0..50 {
            assert_eq!(a.events_for_tick(t), b.events_for_tick(t));
        }
    }
}
