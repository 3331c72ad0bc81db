//! Placement Executor
//!
//! Orchestrates schedule strategies against a placement over the external
//! clock. This is the unit the outer discrete-event engine treats as one
//! schedulable job: once per elapsed simulation interval it calls
//! [`PlacementExecutor::tick`] with the instructions available to the whole
//! placement, and receives back the instructions actually consumed.
//!
//! # Tick cycle
//!
//! ```text
//! For each tick t:
//! 1. Mark queries whose declared duration has elapsed as complete
//! 2. Refill producer backlogs from their generators (active queries only)
//! 3. Split the capacity budget evenly across execution groups
//! 4. Run each group's schedule strategy (allocation + propagation rounds)
//! 5. Advance time
//! ```
//!
//! Groups share no vertex or queue state; they are processed in a fixed
//! order, and within one minute bucket all accumulation is commutative, so
//! group order never affects aggregate metrics.
//!
//! # Determinism
//!
//! Running the same configuration twice yields identical metrics: the only
//! randomness source is the seeded Poisson generator, all maps iterate in
//! key order, and every rounding rule is explicit.
//!
//! # Example
//!
//! ```
//! use cep_simulator_core_rs::executor::{
//!     AllocationConfig, ExecutorConfig, PlacementExecutor, ScheduleConfig,
//! };
//! use cep_simulator_core_rs::generator::GeneratorConfig;
//! use cep_simulator_core_rs::query::{Edge, Query, Vertex};
//!
//! let query = Query::new(
//!     "q1",
//!     vec![
//!         Vertex::producer("src", 10, GeneratorConfig::Uniform { rate: 10 }),
//!         Vertex::operator("op", 10, 2048),
//!         Vertex::consumer("sink", 10, 2048),
//!     ],
//!     vec![Edge::new("src", "op", 1.0), Edge::new("op", "sink", 1.0)],
//!     60,
//! )
//! .unwrap();
//!
//! let config = ExecutorConfig {
//!     queries: vec![query],
//!     group_size: 2,
//!     allocation: AllocationConfig::Uniform,
//!     schedule: ScheduleConfig::Dynamic { rounds: 3 },
//!     tick_interval_secs: 0.1,
//! };
//!
//! let mut executor = PlacementExecutor::new(config).unwrap();
//! while !executor.is_complete() {
//!     let result = executor.tick(300);
//!     assert!(result.instructions_consumed <= 300);
//! }
//! ```

use crate::core::time::TimeManager;
use crate::metrics::MetricsAggregator;
use crate::placement::{Placement, PlacementError};
use crate::query::{Query, VertexId};
use crate::sched::{
    DynamicSchedule, ScheduleStrategy, StaticSchedule, UniformAllocation, WeightedAllocation,
};
use crate::state::RuntimeState;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

// ============================================================================
// Configuration Types
// ============================================================================

/// Complete executor configuration
///
/// This struct contains all parameters needed to set up one placement run.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutorConfig {
    /// Validated queries to execute
    pub queries: Vec<Query>,

    /// Capacity-consuming vertices per execution group (placement packing)
    pub group_size: usize,

    /// Allocation policy apportioning each group's per-tick budget
    pub allocation: AllocationConfig,

    /// Schedule protocol driving allocation rounds within a tick
    pub schedule: ScheduleConfig,

    /// Real-time duration of one tick in seconds (minute-bucket conversion)
    pub tick_interval_secs: f64,
}

/// Allocation policy selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AllocationConfig {
    /// Even split across vertices with pending work (baseline)
    Uniform,

    /// Split proportional to per-vertex weights (largest remainder)
    Weighted {
        /// Vertex identifier -> weight; absent vertices default to 1.0
        weights: BTreeMap<String, f64>,
    },
}

/// Schedule protocol selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScheduleConfig {
    /// One allocation + propagation round per tick
    Static,

    /// `rounds` sub-rounds per tick, re-allocating against updated queue
    /// state after each round's propagation
    Dynamic { rounds: usize },
}

/// Result of a single tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickResult {
    /// Tick number that was just executed
    pub tick: u64,

    /// Events generated into producer backlogs this tick
    pub events_generated: u64,

    /// Instructions actually consumed this tick (≤ the offered capacity)
    pub instructions_consumed: u64,
}

/// Errors raised at executor construction. Fatal: setup aborts, nothing is
/// partially applied.
#[derive(Debug, Error, PartialEq)]
pub enum SimulationError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Placement(#[from] PlacementError),
}

// ============================================================================
// Placement Executor
// ============================================================================

/// Per-query completion bookkeeping.
#[derive(Debug, Clone)]
struct QueryProgress {
    duration: u64,
    complete: bool,
}

/// Executes a placement tick by tick.
///
/// Owns one schedule-strategy instance per execution group, the mutable
/// runtime state of every vertex, and the metrics aggregator observing all
/// consume/produce/drop effects.
pub struct PlacementExecutor {
    placement: Placement,
    /// One strategy per group, index-aligned with `placement.groups()`
    strategies: Vec<Box<dyn ScheduleStrategy>>,
    state: RuntimeState,
    metrics: MetricsAggregator,
    time: TimeManager,
    /// Query id -> progress, in query-id order
    queries: BTreeMap<String, QueryProgress>,
}

impl PlacementExecutor {
    /// Create a new executor from configuration.
    ///
    /// Validates the configuration and computes the placement; structural
    /// errors surface here and never produce a partially-initialized
    /// executor.
    pub fn new(config: ExecutorConfig) -> Result<Self, SimulationError> {
        Self::validate_config(&config)?;

        let placement = Placement::with_queries(&config.queries, config.group_size)?;

        let strategies = (0..placement.num_groups())
            .map(|_| Self::build_strategy(&config))
            .collect();

        let queries = config
            .queries
            .iter()
            .map(|query| {
                (
                    query.id().to_string(),
                    QueryProgress {
                        duration: query.duration(),
                        complete: false,
                    },
                )
            })
            .collect();

        Ok(Self {
            placement,
            strategies,
            state: RuntimeState::new(&config.queries),
            metrics: MetricsAggregator::new(config.tick_interval_secs),
            time: TimeManager::new(config.tick_interval_secs),
            queries,
        })
    }

    /// Validate configuration
    fn validate_config(config: &ExecutorConfig) -> Result<(), SimulationError> {
        if config.tick_interval_secs <= 0.0 {
            return Err(SimulationError::InvalidConfig(
                "tick_interval_secs must be positive".to_string(),
            ));
        }

        if let ScheduleConfig::Dynamic { rounds } = config.schedule {
            if rounds == 0 {
                return Err(SimulationError::InvalidConfig(
                    "dynamic schedule needs at least one round".to_string(),
                ));
            }
        }

        if let AllocationConfig::Weighted { weights } = &config.allocation {
            for (vertex, weight) in weights {
                if *weight <= 0.0 {
                    return Err(SimulationError::InvalidConfig(format!(
                        "weight for {} must be positive",
                        vertex
                    )));
                }
            }
        }

        // Check for duplicate query and vertex identifiers across the set
        let mut query_ids = BTreeSet::new();
        let mut vertex_ids = BTreeSet::new();
        for query in &config.queries {
            if !query_ids.insert(query.id()) {
                return Err(SimulationError::InvalidConfig(format!(
                    "duplicate query identifier: {}",
                    query.id()
                )));
            }
            for vertex in query.vertices() {
                if !vertex_ids.insert(vertex.id().clone()) {
                    return Err(SimulationError::InvalidConfig(format!(
                        "duplicate vertex identifier across queries: {}",
                        vertex.id()
                    )));
                }
            }
        }

        Ok(())
    }

    fn build_strategy(config: &ExecutorConfig) -> Box<dyn ScheduleStrategy> {
        let allocation: Box<dyn crate::sched::AllocationStrategy> = match &config.allocation {
            AllocationConfig::Uniform => Box::new(UniformAllocation),
            AllocationConfig::Weighted { weights } => Box::new(WeightedAllocation::new(
                weights
                    .iter()
                    .map(|(id, weight)| (VertexId::new(id.clone()), *weight))
                    .collect(),
            )),
        };
        match config.schedule {
            ScheduleConfig::Static => Box::new(StaticSchedule::new(allocation)),
            ScheduleConfig::Dynamic { rounds } => {
                Box::new(DynamicSchedule::new(allocation, rounds))
            }
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Get current tick number (ticks executed so far)
    pub fn current_tick(&self) -> u64 {
        self.time.current_tick()
    }

    /// True once every owned query has exceeded its declared duration.
    pub fn is_complete(&self) -> bool {
        self.queries.values().all(|progress| progress.complete)
    }

    /// Get reference to the metrics aggregator
    pub fn metrics(&self) -> &MetricsAggregator {
        &self.metrics
    }

    /// Get reference to the runtime state
    ///
    /// Primarily for tests and diagnostics; direct mutation is not exposed.
    pub fn state(&self) -> &RuntimeState {
        &self.state
    }

    /// Get reference to the placement
    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    // Reporting surface (delegates to the metrics aggregator)

    /// Mean consumption latency (ticks) per minute for a vertex.
    pub fn latency_by_minute(&self, vertex: &VertexId) -> Vec<(u64, f64)> {
        self.metrics.latency_by_minute(vertex)
    }

    /// Events consumed per minute for a vertex.
    pub fn throughput_by_minute(&self, vertex: &VertexId) -> Vec<(u64, u64)> {
        self.metrics.throughput_by_minute(vertex)
    }

    /// Events lost to queue overflow per minute for a vertex.
    pub fn dropped_by_minute(&self, vertex: &VertexId) -> Vec<(u64, u64)> {
        self.metrics.dropped_by_minute(vertex)
    }

    // ========================================================================
    // Tick Loop
    // ========================================================================

    /// Execute one simulation tick with `available_capacity` instructions.
    ///
    /// Returns the tick's accounting; `instructions_consumed` is what the
    /// outer engine charges as elapsed processing time.
    ///
    /// # Panics
    /// Panics if `available_capacity` is zero (the outer clock contract
    /// promises a positive budget).
    pub fn tick(&mut self, available_capacity: u64) -> TickResult {
        assert!(available_capacity > 0, "available_capacity must be positive");

        let tick = self.time.current_tick();

        // STEP 1: COMPLETION
        // A query that has run for its declared duration stops consuming and
        // producing; its metrics stay.
        for (query_id, progress) in &mut self.queries {
            if !progress.complete && tick >= progress.duration {
                progress.complete = true;
                tracing::info!(query = %query_id, tick, "query complete");
            }
        }

        if self.is_complete() {
            self.time.advance_tick();
            return TickResult {
                tick,
                events_generated: 0,
                instructions_consumed: 0,
            };
        }

        // STEP 2: GENERATION
        // One generator call per producer of each still-active query.
        let mut events_generated = 0u64;
        for producer in self.state.producer_ids() {
            if self.query_active(&producer) {
                events_generated += self.state.generate(&producer, tick);
            }
        }

        // STEP 3 + 4: GROUP SCHEDULING
        // Capacity splits evenly across groups (remainder to the lowest
        // group ids); each group runs its own strategy over the vertices of
        // its still-active queries.
        let num_groups = self.placement.num_groups() as u64;
        let share = available_capacity / num_groups;
        let remainder = available_capacity % num_groups;

        let mut instructions_consumed = 0u64;
        for (index, group) in self.placement.groups().iter().enumerate() {
            let active: Vec<VertexId> = group
                .vertices()
                .iter()
                .filter(|vertex| self.query_active(vertex))
                .cloned()
                .collect();
            if active.is_empty() {
                continue;
            }

            let extra = if (index as u64) < remainder { 1 } else { 0 };
            let budget = share + extra;
            if budget == 0 {
                continue;
            }

            instructions_consumed += self.strategies[index].run_tick(
                &active,
                &mut self.state,
                &mut self.metrics,
                tick,
                budget,
            );
        }
        debug_assert!(instructions_consumed <= available_capacity);

        // STEP 5: ADVANCE TIME
        self.time.advance_tick();

        tracing::debug!(tick, events_generated, instructions_consumed, "tick done");

        TickResult {
            tick,
            events_generated,
            instructions_consumed,
        }
    }

    fn query_active(&self, vertex: &VertexId) -> bool {
        let query_id = self.state.query_id(vertex);
        !self
            .queries
            .get(query_id)
            .expect("vertex belongs to a known query")
            .complete
    }
}

// Manual Debug implementation (schedule strategies don't implement Debug)
impl std::fmt::Debug for PlacementExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacementExecutor")
            .field("current_tick", &self.current_tick())
            .field("num_groups", &self.placement.num_groups())
            .field("num_queries", &self.queries.len())
            .field("is_complete", &self.is_complete())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
