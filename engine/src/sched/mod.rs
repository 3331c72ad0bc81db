//! Schedule strategies
//!
//! A schedule strategy drives one tick of processing for one execution
//! group: it invokes the allocation strategy one or more times, converts
//! granted instructions into processed-event counts, and triggers event
//! propagation after each allocation round.
//!
//! Each tick conceptually walks Idle → Allocating → Propagating → Idle; both
//! strategies implement the transitions as a plain synchronous loop.
//!
//! # Round semantics
//!
//! Every round snapshots pending-event counts first, then allocates against
//! that snapshot, then applies effects vertex by vertex in a fixed order.
//! Events forwarded during a round therefore become visible to allocation
//! only in the *next* round: the static strategy's single round advances the
//! pipeline one stage per tick, while the dynamic strategy's sub-rounds let
//! events traverse several stages within one tick and let capacity freed by
//! a drained queue be redirected before the tick ends.
//!
//! Both strategies are deterministic given the same inputs: no wall clock,
//! no unseeded randomness.

pub mod alloc;

pub use alloc::{AllocationStrategy, UniformAllocation, WeightedAllocation};

use crate::metrics::MetricsAggregator;
use crate::query::VertexId;
use crate::state::RuntimeState;
use std::collections::BTreeMap;

/// Drives one tick of allocation + propagation for one execution group.
pub trait ScheduleStrategy: Send {
    /// Run one full tick cycle over `vertices` with `budget` instructions.
    ///
    /// Returns the instructions actually consumed (≤ `budget`).
    fn run_tick(
        &mut self,
        vertices: &[VertexId],
        state: &mut RuntimeState,
        metrics: &mut MetricsAggregator,
        tick: u64,
        budget: u64,
    ) -> u64;
}

/// One allocation + propagation round.
///
/// Asserts the allocation contract (sum ≤ budget, zero to idle vertices) —
/// a violation is a strategy bug, not a recoverable runtime condition.
///
/// Returns the instructions actually consumed this round.
fn run_round(
    allocation: &dyn AllocationStrategy,
    vertices: &[VertexId],
    state: &mut RuntimeState,
    metrics: &mut MetricsAggregator,
    tick: u64,
    budget: u64,
) -> u64 {
    // Allocation and event-count conversion both work off the pending state
    // as it stood when the round began.
    let snapshot: BTreeMap<&VertexId, u64> =
        vertices.iter().map(|v| (v, state.pending(v))).collect();

    let grants = allocation.allocate(vertices, state, budget);

    let granted_total: u64 = grants.values().sum();
    assert!(
        granted_total <= budget,
        "allocation granted {} instructions with only {} available",
        granted_total,
        budget
    );
    for (vertex, granted) in &grants {
        assert!(
            *granted == 0 || snapshot.get(vertex).copied().unwrap_or(0) > 0,
            "allocation granted {} instructions to idle vertex {}",
            granted,
            vertex
        );
    }

    let mut consumed_instructions = 0u64;
    for vertex in vertices {
        let granted = grants.get(vertex).copied().unwrap_or(0);
        if granted == 0 {
            continue;
        }
        let cost = state.cost_per_event(vertex);
        let events = (granted / cost).min(snapshot[vertex]);
        if events == 0 {
            continue;
        }

        let sets = state.consume(vertex, events);
        metrics.record_consumed(vertex, tick, &sets);
        consumed_instructions += events * cost;

        // Terminal consumers produce nothing downstream.
        let outcomes = state.forward(vertex, &sets);
        if !outcomes.is_empty() {
            metrics.record_produced(vertex, tick, events);
        }
        for outcome in outcomes {
            if outcome.dropped > 0 {
                tracing::trace!(
                    source = %vertex,
                    destination = %outcome.destination,
                    dropped = outcome.dropped,
                    "queue overflow"
                );
                metrics.record_dropped(&outcome.destination, tick, outcome.dropped);
            }
        }
    }
    consumed_instructions
}

/// Static schedule: exactly one allocation + propagation round per tick,
/// with the tick's full budget.
pub struct StaticSchedule {
    allocation: Box<dyn AllocationStrategy>,
}

impl StaticSchedule {
    pub fn new(allocation: Box<dyn AllocationStrategy>) -> Self {
        Self { allocation }
    }
}

impl ScheduleStrategy for StaticSchedule {
    fn run_tick(
        &mut self,
        vertices: &[VertexId],
        state: &mut RuntimeState,
        metrics: &mut MetricsAggregator,
        tick: u64,
        budget: u64,
    ) -> u64 {
        run_round(self.allocation.as_ref(), vertices, state, metrics, tick, budget)
    }
}

/// Dynamic schedule: subdivides the tick budget into `rounds` sub-rounds,
/// re-invoking the allocation strategy against the updated queue state after
/// each round's propagation.
///
/// Budget is split evenly across rounds (remainder to the earliest rounds);
/// instructions a round leaves unspent roll into the next round's budget, so
/// capacity freed by a drained queue is redirected within the same tick.
pub struct DynamicSchedule {
    allocation: Box<dyn AllocationStrategy>,
    rounds: usize,
}

impl DynamicSchedule {
    /// # Panics
    /// Panics if `rounds` is zero.
    pub fn new(allocation: Box<dyn AllocationStrategy>, rounds: usize) -> Self {
        assert!(rounds >= 1, "dynamic schedule needs at least one round");
        Self { allocation, rounds }
    }
}

impl ScheduleStrategy for DynamicSchedule {
    fn run_tick(
        &mut self,
        vertices: &[VertexId],
        state: &mut RuntimeState,
        metrics: &mut MetricsAggregator,
        tick: u64,
        budget: u64,
    ) -> u64 {
        let rounds = self.rounds as u64;
        let chunk = budget / rounds;
        let remainder = budget % rounds;

        let mut consumed_total = 0u64;
        let mut rollover = 0u64;
        for round in 0..rounds {
            let extra = if round < remainder { 1 } else { 0 };
            let round_budget = chunk + extra + rollover;
            let consumed = run_round(
                self.allocation.as_ref(),
                vertices,
                state,
                metrics,
                tick,
                round_budget,
            );
            rollover = round_budget - consumed;
            consumed_total += consumed;
        }
        consumed_total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GeneratorConfig;
    use crate::query::{Edge, Query, Vertex};

    fn pipeline_state() -> (RuntimeState, Vec<VertexId>) {
        let query = Query::new(
            "q",
            vec![
                Vertex::producer("a_src", 10, GeneratorConfig::Uniform { rate: 10 }),
                Vertex::operator("b_op", 10, 1024),
                Vertex::consumer("c_sink", 10, 1024),
            ],
            vec![Edge::new("a_src", "b_op", 1.0), Edge::new("b_op", "c_sink", 1.0)],
            100,
        )
        .unwrap();
        let ids = query.vertex_ids().into_iter().collect();
        (RuntimeState::new(&[query]), ids)
    }

    #[test]
    fn test_static_advances_one_stage_per_tick() {
        let (mut state, ids) = pipeline_state();
        let mut metrics = MetricsAggregator::new(1.0);
        let mut schedule = StaticSchedule::new(Box::new(UniformAllocation));

        state.generate(&VertexId::new("a_src"), 0);
        let consumed = schedule.run_tick(&ids, &mut state, &mut metrics, 0, 300);

        // Only the producer had pending work at the tick start.
        assert_eq!(consumed, 100); // 10 events x cost 10
        assert_eq!(state.pending(&VertexId::new("b_op")), 10);
        assert_eq!(state.pending(&VertexId::new("c_sink")), 0);
    }

    #[test]
    fn test_dynamic_traverses_pipeline_within_tick() {
        let (mut state, ids) = pipeline_state();
        let mut metrics = MetricsAggregator::new(1.0);
        let mut schedule = DynamicSchedule::new(Box::new(UniformAllocation), 3);

        state.generate(&VertexId::new("a_src"), 0);
        let consumed = schedule.run_tick(&ids, &mut state, &mut metrics, 0, 300);

        // Round 1 drains the producer, round 2 the operator, round 3 the sink.
        assert_eq!(consumed, 300);
        assert_eq!(state.pending(&VertexId::new("b_op")), 0);
        assert_eq!(state.pending(&VertexId::new("c_sink")), 0);
        assert_eq!(
            metrics.throughput_by_minute(&VertexId::new("c_sink")),
            vec![(0, 10)]
        );
    }

    #[test]
    fn test_consumed_never_exceeds_budget() {
        let (mut state, ids) = pipeline_state();
        let mut metrics = MetricsAggregator::new(1.0);
        let mut schedule = DynamicSchedule::new(Box::new(UniformAllocation), 4);

        state.generate(&VertexId::new("a_src"), 0);
        let consumed = schedule.run_tick(&ids, &mut state, &mut metrics, 0, 57);
        assert!(consumed <= 57);
    }

    struct GreedyAllocation;

    impl AllocationStrategy for GreedyAllocation {
        fn allocate(
            &self,
            vertices: &[VertexId],
            _state: &RuntimeState,
            available: u64,
        ) -> BTreeMap<VertexId, u64> {
            // Deliberately broken: grants everything to every vertex.
            vertices.iter().map(|v| (v.clone(), available)).collect()
        }
    }

    #[test]
    #[should_panic(expected = "allocation granted")]
    fn test_contract_violation_fails_loudly() {
        let (mut state, ids) = pipeline_state();
        let mut metrics = MetricsAggregator::new(1.0);
        let mut schedule = StaticSchedule::new(Box::new(GreedyAllocation));

        state.generate(&VertexId::new("a_src"), 0);
        schedule.run_tick(&ids, &mut state, &mut metrics, 0, 300);
    }
}
