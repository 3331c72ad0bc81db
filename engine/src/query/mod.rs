//! Query dataflow graph
//!
//! A query is an immutable, validated directed acyclic graph of vertices
//! (producers, operators, consumers) connected by selectivity-weighted edges,
//! plus a declared duration in ticks. Construction runs the full structural
//! validation; an invalid graph never escapes as a partially-valid value.
//!
//! # Critical Invariants
//!
//! 1. **No dangling endpoints**: every edge references a declared vertex
//! 2. **Fan rules**: producers have zero in-edges, consumers zero out-edges,
//!    operators at least one of each
//! 3. **Acyclicity**: the graph is a DAG in data-flow direction
//! 4. **No isolated vertices**: every vertex participates in at least one
//!    edge (together with the fan rules and acyclicity, this guarantees that
//!    every non-producer is reachable from some producer)
//!
//! # Example
//!
//! ```
//! use cep_simulator_core_rs::generator::GeneratorConfig;
//! use cep_simulator_core_rs::query::{Edge, Query, Vertex};
//!
//! let query = Query::new(
//!     "q1",
//!     vec![
//!         Vertex::producer("sensor", 1_000, GeneratorConfig::Uniform { rate: 10 }),
//!         Vertex::operator("parse", 41_250, 2048),
//!         Vertex::consumer("sink", 1_000, 2048),
//!     ],
//!     vec![
//!         Edge::new("sensor", "parse", 1.0),
//!         Edge::new("parse", "sink", 0.95),
//!     ],
//!     301,
//! )
//! .unwrap();
//!
//! assert_eq!(query.duration(), 301);
//! assert_eq!(query.producers().count(), 1);
//! ```

pub mod edge;
pub mod vertex;

pub use edge::Edge;
pub use vertex::{Vertex, VertexId, VertexKind};

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use thiserror::Error;

/// Errors raised by query-graph validation.
///
/// All variants are fatal to that query's construction.
#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("query has no vertices")]
    EmptyQuery,

    #[error("duplicate vertex identifier: {0}")]
    DuplicateVertex(VertexId),

    #[error("edge references unknown vertex: {0}")]
    DanglingEdge(VertexId),

    #[error("edge {src} -> {destination} has selectivity {selectivity} outside [0.0, 1.0]")]
    InvalidSelectivity {
        src: VertexId,
        destination: VertexId,
        selectivity: f64,
    },

    #[error("vertex {0} violates fan-in rules (producers take no inputs; operators and consumers need at least one)")]
    InvalidFanIn(VertexId),

    #[error("vertex {0} violates fan-out rules (consumers emit no outputs; operators need at least one)")]
    InvalidFanOut(VertexId),

    #[error("vertex {0} is not connected to the dataflow graph")]
    OrphanVertex(VertexId),

    #[error("query graph contains a cycle")]
    Cycle,
}

/// Immutable, validated query dataflow graph.
///
/// The graph value carries no mutable simulation state: pending queues and
/// selectivity carries live in [`RuntimeState`](crate::state::RuntimeState),
/// keyed by vertex identifier, so a `Query` can be shared across runs.
#[derive(Debug, Clone, Serialize)]
pub struct Query {
    id: String,
    vertices: BTreeMap<VertexId, Vertex>,
    /// Edges in declaration order — the FIFO tie-break for same-tick arrivals
    edges: Vec<Edge>,
    /// Number of ticks the query is eligible to run
    duration: u64,
}

impl Query {
    /// Validate the vertex and edge sets and construct the query.
    ///
    /// Checks, in order: non-empty vertex set, unique vertex identifiers,
    /// no dangling edge endpoints, selectivity bounds, fan-in/fan-out rules,
    /// no isolated vertices, acyclicity (Kahn's algorithm).
    pub fn new(
        id: impl Into<String>,
        vertices: Vec<Vertex>,
        edges: Vec<Edge>,
        duration: u64,
    ) -> Result<Self, GraphError> {
        if vertices.is_empty() {
            return Err(GraphError::EmptyQuery);
        }

        let mut vertex_map: BTreeMap<VertexId, Vertex> = BTreeMap::new();
        for vertex in vertices {
            let vid = vertex.id().clone();
            if vertex_map.insert(vid.clone(), vertex).is_some() {
                return Err(GraphError::DuplicateVertex(vid));
            }
        }

        for edge in &edges {
            for endpoint in [edge.source(), edge.destination()] {
                if !vertex_map.contains_key(endpoint) {
                    return Err(GraphError::DanglingEdge(endpoint.clone()));
                }
            }
            if !(0.0..=1.0).contains(&edge.selectivity()) {
                return Err(GraphError::InvalidSelectivity {
                    src: edge.source().clone(),
                    destination: edge.destination().clone(),
                    selectivity: edge.selectivity(),
                });
            }
        }

        let mut in_degree: BTreeMap<&VertexId, usize> = BTreeMap::new();
        let mut out_degree: BTreeMap<&VertexId, usize> = BTreeMap::new();
        for edge in &edges {
            *out_degree.entry(edge.source()).or_default() += 1;
            *in_degree.entry(edge.destination()).or_default() += 1;
        }

        for (vid, vertex) in &vertex_map {
            let fan_in = in_degree.get(vid).copied().unwrap_or(0);
            let fan_out = out_degree.get(vid).copied().unwrap_or(0);
            match vertex.kind() {
                VertexKind::Producer => {
                    if fan_in > 0 {
                        return Err(GraphError::InvalidFanIn(vid.clone()));
                    }
                }
                VertexKind::Operator => {
                    if fan_in == 0 {
                        return Err(GraphError::InvalidFanIn(vid.clone()));
                    }
                    if fan_out == 0 {
                        return Err(GraphError::InvalidFanOut(vid.clone()));
                    }
                }
                VertexKind::Consumer => {
                    if fan_out > 0 {
                        return Err(GraphError::InvalidFanOut(vid.clone()));
                    }
                    if fan_in == 0 {
                        return Err(GraphError::InvalidFanIn(vid.clone()));
                    }
                }
            }
            if fan_in == 0 && fan_out == 0 {
                return Err(GraphError::OrphanVertex(vid.clone()));
            }
        }

        Self::check_acyclic(&vertex_map, &edges)?;

        Ok(Self {
            id: id.into(),
            vertices: vertex_map,
            edges,
            duration,
        })
    }

    /// Kahn's algorithm: repeatedly remove zero-in-degree vertices; anything
    /// left over sits on a cycle.
    fn check_acyclic(
        vertices: &BTreeMap<VertexId, Vertex>,
        edges: &[Edge],
    ) -> Result<(), GraphError> {
        let mut in_degree: BTreeMap<&VertexId, usize> =
            vertices.keys().map(|vid| (vid, 0)).collect();
        let mut successors: BTreeMap<&VertexId, Vec<&VertexId>> = BTreeMap::new();
        for edge in edges {
            *in_degree.get_mut(edge.destination()).expect("validated endpoint") += 1;
            successors.entry(edge.source()).or_default().push(edge.destination());
        }

        let mut ready: VecDeque<&VertexId> = in_degree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(vid, _)| *vid)
            .collect();
        let mut visited = 0usize;

        while let Some(vid) = ready.pop_front() {
            visited += 1;
            for &succ in successors.get(vid).into_iter().flatten() {
                let deg = in_degree.get_mut(succ).expect("validated endpoint");
                *deg -= 1;
                if *deg == 0 {
                    ready.push_back(succ);
                }
            }
        }

        if visited == vertices.len() {
            Ok(())
        } else {
            Err(GraphError::Cycle)
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    /// Vertices in identifier order.
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.values()
    }

    pub fn vertex(&self, id: &VertexId) -> Option<&Vertex> {
        self.vertices.get(id)
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Edges in declaration order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn producers(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.values().filter(|v| v.is_producer())
    }

    pub fn consumers(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices
            .values()
            .filter(|v| v.kind() == VertexKind::Consumer)
    }

    /// Output edges of `id` in declaration order.
    pub fn output_edges<'a>(&'a self, id: &'a VertexId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source() == id)
    }

    /// Input edges of `id` in declaration order.
    pub fn input_edges<'a>(&'a self, id: &'a VertexId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.destination() == id)
    }

    /// Identifiers of all vertices, in identifier order.
    pub fn vertex_ids(&self) -> BTreeSet<VertexId> {
        self.vertices.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GeneratorConfig;

    fn uniform(rate: u64) -> GeneratorConfig {
        GeneratorConfig::Uniform { rate }
    }

    fn pipeline() -> Query {
        Query::new(
            "q",
            vec![
                Vertex::producer("src", 10, uniform(5)),
                Vertex::operator("op", 10, 64),
                Vertex::consumer("sink", 10, 64),
            ],
            vec![Edge::new("src", "op", 1.0), Edge::new("op", "sink", 1.0)],
            100,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_pipeline() {
        let q = pipeline();
        assert_eq!(q.num_vertices(), 3);
        assert_eq!(q.edges().len(), 2);
        assert_eq!(q.consumers().count(), 1);
    }

    #[test]
    fn test_empty_query_rejected() {
        let err = Query::new("q", vec![], vec![], 10).unwrap_err();
        assert_eq!(err, GraphError::EmptyQuery);
    }

    #[test]
    fn test_dangling_edge_rejected() {
        let err = Query::new(
            "q",
            vec![
                Vertex::producer("src", 10, uniform(1)),
                Vertex::consumer("sink", 10, 64),
            ],
            vec![Edge::new("src", "ghost", 1.0)],
            10,
        )
        .unwrap_err();
        assert_eq!(err, GraphError::DanglingEdge(VertexId::new("ghost")));
    }

    #[test]
    fn test_selectivity_out_of_bounds_rejected() {
        let err = Query::new(
            "q",
            vec![
                Vertex::producer("src", 10, uniform(1)),
                Vertex::consumer("sink", 10, 64),
            ],
            vec![Edge::new("src", "sink", 1.5)],
            10,
        )
        .unwrap_err();
        assert!(matches!(err, GraphError::InvalidSelectivity { .. }));
    }

    #[test]
    fn test_orphan_vertex_rejected() {
        let err = Query::new(
            "q",
            vec![
                Vertex::producer("src", 10, uniform(1)),
                Vertex::producer("loner", 10, uniform(1)),
                Vertex::consumer("sink", 10, 64),
            ],
            vec![Edge::new("src", "sink", 1.0)],
            10,
        )
        .unwrap_err();
        assert_eq!(err, GraphError::OrphanVertex(VertexId::new("loner")));
    }
}
