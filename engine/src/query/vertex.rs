//! Vertex model
//!
//! A vertex is one node of a query's dataflow graph. Vertices come in three
//! kinds, modeled as a closed sum type:
//! - **Producer**: originates events from an attached generator; no inputs
//! - **Operator**: transforms events; at least one input and one output edge
//! - **Consumer**: terminal sink; at least one input edge, no outputs
//!
//! Every vertex carries a per-event instruction cost — the number of
//! processing instructions one event costs at this vertex. Operators and
//! consumers additionally carry a bounded input-queue capacity; arrivals
//! beyond that capacity are dropped (the modeled backpressure behavior).

use crate::generator::GeneratorConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable vertex identifier.
///
/// Identifier ordering is load-bearing: every deterministic tie-break in the
/// allocation and placement layers is resolved in `VertexId` order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VertexId(String);

impl VertexId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VertexId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for VertexId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Vertex kind discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VertexKind {
    Producer,
    Operator,
    Consumer,
}

/// A node in a query's dataflow graph.
///
/// # Example
/// ```
/// use cep_simulator_core_rs::generator::GeneratorConfig;
/// use cep_simulator_core_rs::query::Vertex;
///
/// let sensor = Vertex::producer("sensor", 1_000, GeneratorConfig::Uniform { rate: 10 });
/// let parse = Vertex::operator("parse", 41_250, 2048);
/// let sink = Vertex::consumer("sink", 1_000, 2048);
///
/// assert_eq!(sensor.cost_per_event(), 1_000);
/// assert_eq!(parse.queue_capacity(), Some(2048));
/// assert_eq!(sink.queue_capacity(), Some(2048));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Vertex {
    /// Event source: holds a generator, competes for capacity to emit.
    Producer {
        id: VertexId,
        /// Instructions consumed per emitted event
        cost_per_event: u64,
        /// Per-tick arrival configuration
        generator: GeneratorConfig,
    },

    /// Intermediate processing stage.
    Operator {
        id: VertexId,
        /// Instructions consumed per processed event
        cost_per_event: u64,
        /// Bounded input queue size in events; overflow arrivals are dropped
        queue_capacity: u64,
    },

    /// Terminal sink.
    Consumer {
        id: VertexId,
        /// Instructions consumed per processed event
        cost_per_event: u64,
        /// Bounded input queue size in events; overflow arrivals are dropped
        queue_capacity: u64,
    },
}

impl Vertex {
    /// Create a producer vertex.
    ///
    /// # Panics
    /// Panics if `cost_per_event` is zero.
    pub fn producer(id: impl Into<VertexId>, cost_per_event: u64, generator: GeneratorConfig) -> Self {
        assert!(cost_per_event > 0, "cost_per_event must be positive");
        Vertex::Producer {
            id: id.into(),
            cost_per_event,
            generator,
        }
    }

    /// Create an operator vertex.
    ///
    /// # Panics
    /// Panics if `cost_per_event` or `queue_capacity` is zero.
    pub fn operator(id: impl Into<VertexId>, cost_per_event: u64, queue_capacity: u64) -> Self {
        assert!(cost_per_event > 0, "cost_per_event must be positive");
        assert!(queue_capacity > 0, "queue_capacity must be positive");
        Vertex::Operator {
            id: id.into(),
            cost_per_event,
            queue_capacity,
        }
    }

    /// Create a consumer vertex.
    ///
    /// # Panics
    /// Panics if `cost_per_event` or `queue_capacity` is zero.
    pub fn consumer(id: impl Into<VertexId>, cost_per_event: u64, queue_capacity: u64) -> Self {
        assert!(cost_per_event > 0, "cost_per_event must be positive");
        assert!(queue_capacity > 0, "queue_capacity must be positive");
        Vertex::Consumer {
            id: id.into(),
            cost_per_event,
            queue_capacity,
        }
    }

    pub fn id(&self) -> &VertexId {
        match self {
            Vertex::Producer { id, .. } | Vertex::Operator { id, .. } | Vertex::Consumer { id, .. } => id,
        }
    }

    pub fn kind(&self) -> VertexKind {
        match self {
            Vertex::Producer { .. } => VertexKind::Producer,
            Vertex::Operator { .. } => VertexKind::Operator,
            Vertex::Consumer { .. } => VertexKind::Consumer,
        }
    }

    pub fn cost_per_event(&self) -> u64 {
        match self {
            Vertex::Producer { cost_per_event, .. }
            | Vertex::Operator { cost_per_event, .. }
            | Vertex::Consumer { cost_per_event, .. } => *cost_per_event,
        }
    }

    /// Input queue capacity; `None` for producers (their backlog is unbounded).
    pub fn queue_capacity(&self) -> Option<u64> {
        match self {
            Vertex::Producer { .. } => None,
            Vertex::Operator { queue_capacity, .. } | Vertex::Consumer { queue_capacity, .. } => {
                Some(*queue_capacity)
            }
        }
    }

    /// Generator configuration; `None` for non-producers.
    pub fn generator(&self) -> Option<&GeneratorConfig> {
        match self {
            Vertex::Producer { generator, .. } => Some(generator),
            _ => None,
        }
    }

    pub fn is_producer(&self) -> bool {
        matches!(self, Vertex::Producer { .. })
    }
}
