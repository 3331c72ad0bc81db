//! CEP Simulator Core - Rust Engine
//!
//! Discrete-time simulation of Complex Event Processing (CEP) query
//! execution with deterministic, reproducible runs.
//!
//! # Architecture
//!
//! - **core**: Time management (ticks, minute buckets)
//! - **query**: Query dataflow graphs (vertices, edges, validation)
//! - **generator**: Per-tick event-arrival generation for producers
//! - **state**: Mutable per-run state (queues, selectivity carries)
//! - **placement**: Grouping of query vertices onto shared capacity
//! - **sched**: Allocation and schedule strategies
//! - **executor**: Tick orchestration and reproducibility digests
//! - **metrics**: Per-vertex, per-minute latency/throughput/drop buckets
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. All randomness is deterministic (seeded RNG)
//! 2. Every rounding rule is explicit (integer apportionment, selectivity
//!    carries) — numeric edge cases never throw
//! 3. Structural errors surface at construction; nothing partially applies

// Module declarations
pub mod core;
pub mod executor;
pub mod generator;
pub mod metrics;
pub mod placement;
pub mod query;
pub mod rng;
pub mod sched;
pub mod state;

// Re-exports for convenience
pub use crate::core::time::TimeManager;
pub use executor::{
    AllocationConfig, ExecutorConfig, PlacementExecutor, ScheduleConfig, SimulationError,
    TickResult,
};
pub use generator::{EventGenerator, GeneratorConfig};
pub use metrics::{MetricsAggregator, MetricsBucket};
pub use placement::{ExecutionGroup, Placement, PlacementError};
pub use query::{Edge, GraphError, Query, Vertex, VertexId, VertexKind};
pub use rng::RngManager;
pub use sched::{
    AllocationStrategy, DynamicSchedule, ScheduleStrategy, StaticSchedule, UniformAllocation,
    WeightedAllocation,
};
pub use state::{EventSet, RuntimeState};
