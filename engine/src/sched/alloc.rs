//! Allocation strategies
//!
//! An allocation strategy is a pure apportionment function: given the
//! vertices of one execution group, their pending-event state, and the
//! instruction budget available for the round, it decides how many
//! instructions each vertex is granted.
//!
//! # Contract
//!
//! 1. The granted instructions sum to at most the available budget
//! 2. A vertex with no pending events is granted exactly zero
//!
//! The schedule strategy asserts both after every invocation; a violation is
//! a strategy-implementation bug and fails loudly rather than being masked.
//!
//! Policy selection is the extension point for scheduling-fairness research:
//! swapping the policy changes only the apportionment numbers, never the
//! scheduling protocol around it.

use crate::query::VertexId;
use crate::state::RuntimeState;
use std::collections::BTreeMap;

/// Apportions a group's per-round instruction budget among its vertices.
pub trait AllocationStrategy: Send + Sync {
    /// Grant instructions to `vertices` out of `available`.
    ///
    /// `vertices` is the group's active vertex set for this round; pending
    /// state is read from `state`. Vertices absent from the returned map are
    /// granted zero.
    fn allocate(
        &self,
        vertices: &[VertexId],
        state: &RuntimeState,
        available: u64,
    ) -> BTreeMap<VertexId, u64>;
}

/// Even split across the vertices that have pending work.
///
/// The integer remainder is handed out one instruction at a time in
/// vertex-identifier order, so no vertex is systematically starved by
/// rounding.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformAllocation;

impl AllocationStrategy for UniformAllocation {
    fn allocate(
        &self,
        vertices: &[VertexId],
        state: &RuntimeState,
        available: u64,
    ) -> BTreeMap<VertexId, u64> {
        let mut active: Vec<&VertexId> = vertices
            .iter()
            .filter(|v| state.pending(v) > 0)
            .collect();
        if active.is_empty() {
            return BTreeMap::new();
        }
        active.sort();

        let share = available / active.len() as u64;
        let remainder = available % active.len() as u64;

        active
            .iter()
            .enumerate()
            .map(|(i, vertex)| {
                let extra = if (i as u64) < remainder { 1 } else { 0 };
                ((*vertex).clone(), share + extra)
            })
            .collect()
    }
}

/// Weighted split: grants proportional to per-vertex weights among the
/// vertices with pending work, by largest-remainder apportionment.
///
/// Vertices without an explicit weight default to 1.0. Ties in the remainder
/// distribution break in vertex-identifier order.
#[derive(Debug, Clone, Default)]
pub struct WeightedAllocation {
    weights: BTreeMap<VertexId, f64>,
}

impl WeightedAllocation {
    /// # Panics
    /// Panics if any weight is not positive.
    pub fn new(weights: BTreeMap<VertexId, f64>) -> Self {
        for (vertex, weight) in &weights {
            assert!(*weight > 0.0, "weight for {} must be positive", vertex);
        }
        Self { weights }
    }

    fn weight_of(&self, vertex: &VertexId) -> f64 {
        self.weights.get(vertex).copied().unwrap_or(1.0)
    }
}

impl AllocationStrategy for WeightedAllocation {
    fn allocate(
        &self,
        vertices: &[VertexId],
        state: &RuntimeState,
        available: u64,
    ) -> BTreeMap<VertexId, u64> {
        let mut active: Vec<&VertexId> = vertices
            .iter()
            .filter(|v| state.pending(v) > 0)
            .collect();
        if active.is_empty() {
            return BTreeMap::new();
        }
        active.sort();

        let total_weight: f64 = active.iter().map(|v| self.weight_of(v)).sum();

        // Integer floor of each exact share, then largest-remainder for the
        // instructions the floors left over.
        let mut grants: BTreeMap<VertexId, u64> = BTreeMap::new();
        let mut fractions: Vec<(&VertexId, f64)> = Vec::with_capacity(active.len());
        let mut assigned = 0u64;
        for &vertex in &active {
            let exact = available as f64 * self.weight_of(vertex) / total_weight;
            let floor = exact.floor() as u64;
            assigned += floor;
            grants.insert(vertex.clone(), floor);
            fractions.push((vertex, exact - floor as f64));
        }

        let mut leftover = available - assigned;
        // Largest fraction first; identifier order on ties (sort is stable,
        // `active` is already in identifier order).
        fractions.sort_by(|a, b| b.1.partial_cmp(&a.1).expect("weights are finite"));
        for (vertex, _) in fractions {
            if leftover == 0 {
                break;
            }
            *grants.get_mut(vertex).expect("grant inserted above") += 1;
            leftover -= 1;
        }

        grants
    }
}
