//! Placement of query vertices onto shared execution groups
//!
//! A placement assigns every vertex of every query to exactly one execution
//! group. Each group models one slice of shared, non-preemptible-within-tick
//! processing capacity (one CPU core equivalent): all vertices in a group
//! compete for the same per-tick instruction budget.
//!
//! The packing is a deterministic bin-fill: queries in declaration order;
//! within a query, producers first and then the capacity-consuming vertices,
//! each class in identifier order; `group_size` capacity-consuming vertices
//! per group. Producers are assigned to the group being filled when their
//! query is packed but do not count toward the group size — in the modeled
//! cost structure they do not compete for operator/consumer capacity the way
//! the packing accounts it.

use crate::query::{Query, VertexId};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised at placement construction. Fatal: setup aborts.
#[derive(Debug, Error, PartialEq)]
pub enum PlacementError {
    #[error("placement requires at least one query")]
    EmptyQuerySet,

    #[error("execution group size must be at least 1, got {0}")]
    CapacityUnderflow(usize),
}

/// One shared-capacity execution context and the vertices co-located on it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionGroup {
    id: usize,
    /// Vertices in packing order (query declaration order, then identifier
    /// order within a query)
    vertices: Vec<VertexId>,
}

impl ExecutionGroup {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn vertices(&self) -> &[VertexId] {
        &self.vertices
    }
}

/// Assignment of vertices (possibly from multiple queries) to execution
/// groups.
///
/// # Example
/// ```
/// use cep_simulator_core_rs::generator::GeneratorConfig;
/// use cep_simulator_core_rs::placement::Placement;
/// use cep_simulator_core_rs::query::{Edge, Query, Vertex};
///
/// let query = Query::new(
///     "q1",
///     vec![
///         Vertex::producer("src", 1_000, GeneratorConfig::Uniform { rate: 10 }),
///         Vertex::operator("op", 25_000, 2048),
///         Vertex::consumer("sink", 1_000, 2048),
///     ],
///     vec![Edge::new("src", "op", 1.0), Edge::new("op", "sink", 1.0)],
///     301,
/// )
/// .unwrap();
///
/// // 2 capacity-consuming vertices (op, sink) fit one group of size 2
/// let placement = Placement::with_queries(&[query], 2).unwrap();
/// assert_eq!(placement.num_groups(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Placement {
    groups: Vec<ExecutionGroup>,
    /// Reverse index: vertex -> owning group
    group_index: BTreeMap<VertexId, usize>,
}

impl Placement {
    /// Pack the queries' vertices into groups of `group_size`
    /// capacity-consuming vertices each.
    pub fn with_queries(queries: &[Query], group_size: usize) -> Result<Self, PlacementError> {
        if queries.is_empty() {
            return Err(PlacementError::EmptyQuerySet);
        }
        if group_size < 1 {
            return Err(PlacementError::CapacityUnderflow(group_size));
        }

        let mut groups: Vec<ExecutionGroup> = Vec::new();
        let mut current: Vec<VertexId> = Vec::new();
        let mut packed = 0usize;

        for query in queries {
            // Producers ride along with their query's capacity-consuming
            // vertices; packing them first keeps them in the same group.
            for vertex in query.producers() {
                current.push(vertex.id().clone());
            }
            for vertex in query.vertices().filter(|v| !v.is_producer()) {
                current.push(vertex.id().clone());
                packed += 1;
                if packed == group_size {
                    groups.push(ExecutionGroup {
                        id: groups.len(),
                        vertices: std::mem::take(&mut current),
                    });
                    packed = 0;
                }
            }
        }
        if !current.is_empty() {
            groups.push(ExecutionGroup {
                id: groups.len(),
                vertices: current,
            });
        }

        let mut group_index = BTreeMap::new();
        for group in &groups {
            for vertex in &group.vertices {
                group_index.insert(vertex.clone(), group.id);
            }
        }

        Ok(Self {
            groups,
            group_index,
        })
    }

    pub fn groups(&self) -> &[ExecutionGroup] {
        &self.groups
    }

    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    /// Group owning the given vertex, if it is part of this placement.
    pub fn group_of(&self, id: &VertexId) -> Option<usize> {
        self.group_index.get(id).copied()
    }
}
