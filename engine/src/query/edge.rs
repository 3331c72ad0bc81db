//! Edge model
//!
//! A directed edge of the query dataflow graph, weighted by selectivity:
//! the expected fraction of events processed by the source vertex that are
//! forwarded toward this destination. Selectivities of the edges leaving a
//! vertex are independent forwarding rates, not a partition — they are not
//! required to sum to 1.

use crate::query::vertex::VertexId;
use serde::{Deserialize, Serialize};

/// Directed, selectivity-weighted edge between two vertices.
///
/// # Example
/// ```
/// use cep_simulator_core_rs::query::Edge;
///
/// let edge = Edge::new("filter", "sink", 0.95);
/// assert_eq!(edge.source().as_str(), "filter");
/// assert_eq!(edge.selectivity(), 0.95);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    source: VertexId,
    destination: VertexId,
    /// Expected fraction of the source's processed events forwarded along
    /// this edge, in [0.0, 1.0]. Bounds are enforced at query validation.
    selectivity: f64,
}

impl Edge {
    pub fn new(
        source: impl Into<VertexId>,
        destination: impl Into<VertexId>,
        selectivity: f64,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            selectivity,
        }
    }

    pub fn source(&self) -> &VertexId {
        &self.source
    }

    pub fn destination(&self) -> &VertexId {
        &self.destination
    }

    pub fn selectivity(&self) -> f64 {
        self.selectivity
    }
}
