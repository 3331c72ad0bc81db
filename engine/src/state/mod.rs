//! Runtime simulation state
//!
//! The validated [`Query`](crate::query::Query) values are immutable; all
//! mutable per-run state lives here, in a side table keyed by vertex
//! identifier:
//!
//! - the pending-event FIFO of each vertex (batches of events sharing an
//!   origination tick),
//! - the fractional selectivity carry of each output edge,
//! - the instantiated event generator of each producer.
//!
//! # Critical Invariants
//!
//! 1. **FIFO consumption**: events are consumed oldest-origination-first;
//!    same-tick arrivals keep edge-declaration order because upstream
//!    vertices forward in that order
//! 2. **Bounded queues**: operator/consumer queues clamp at their declared
//!    capacity; overflow arrivals are dropped and reported, never an error
//! 3. **Deterministic rounding**: per-edge emission is
//!    `floor(selectivity * count + carry)` with the fractional carry
//!    persisted across ticks, so long-run averages match the selectivity

use crate::generator::EventGenerator;
use crate::query::{Query, VertexId, VertexKind};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

/// A batch of pending events sharing an origination tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSet {
    /// Tick at which the events were generated by their producer
    pub origin_tick: u64,
    /// Number of events in the batch
    pub count: u64,
}

/// Result of forwarding along one output edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardOutcome {
    pub destination: VertexId,
    /// Events accepted into the destination queue
    pub enqueued: u64,
    /// Events lost to queue overflow at the destination
    pub dropped: u64,
}

/// One output edge's runtime side: destination, selectivity, fractional carry.
struct OutputChannel {
    destination: VertexId,
    selectivity: f64,
    carry: f64,
}

/// Mutable runtime entry for one vertex.
struct VertexRuntime {
    kind: VertexKind,
    cost_per_event: u64,
    /// `None` for producers (unbounded generation backlog)
    queue_capacity: Option<u64>,
    query_id: String,
    /// Pending events, oldest origination first
    pending: VecDeque<EventSet>,
    /// Cached sum of `pending` counts
    pending_total: u64,
    /// Output edges in declaration order
    outputs: Vec<OutputChannel>,
    generator: Option<Box<dyn EventGenerator>>,
}

/// Per-run mutable state for every vertex of every query.
///
/// Vertex identifiers must be unique across the query set; the executor
/// validates this before constructing the state.
pub struct RuntimeState {
    vertices: BTreeMap<VertexId, VertexRuntime>,
}

impl RuntimeState {
    /// Build runtime entries (queues, carries, generator instances) for the
    /// given query set.
    pub fn new(queries: &[Query]) -> Self {
        let mut vertices = BTreeMap::new();
        for query in queries {
            for vertex in query.vertices() {
                let outputs = query
                    .output_edges(vertex.id())
                    .map(|edge| OutputChannel {
                        destination: edge.destination().clone(),
                        selectivity: edge.selectivity(),
                        carry: 0.0,
                    })
                    .collect();
                vertices.insert(
                    vertex.id().clone(),
                    VertexRuntime {
                        kind: vertex.kind(),
                        cost_per_event: vertex.cost_per_event(),
                        queue_capacity: vertex.queue_capacity(),
                        query_id: query.id().to_string(),
                        pending: VecDeque::new(),
                        pending_total: 0,
                        outputs,
                        generator: vertex.generator().map(|config| config.build()),
                    },
                );
            }
        }
        Self { vertices }
    }

    fn entry(&self, id: &VertexId) -> &VertexRuntime {
        self.vertices.get(id).expect("unknown vertex id")
    }

    fn entry_mut(&mut self, id: &VertexId) -> &mut VertexRuntime {
        self.vertices.get_mut(id).expect("unknown vertex id")
    }

    /// Number of pending (not-yet-processed) events at a vertex.
    pub fn pending(&self, id: &VertexId) -> u64 {
        self.entry(id).pending_total
    }

    /// Per-event instruction cost of a vertex.
    pub fn cost_per_event(&self, id: &VertexId) -> u64 {
        self.entry(id).cost_per_event
    }

    pub fn kind(&self, id: &VertexId) -> VertexKind {
        self.entry(id).kind
    }

    /// Identifier of the query that owns this vertex.
    pub fn query_id(&self, id: &VertexId) -> &str {
        &self.entry(id).query_id
    }

    /// Ask the producer's generator for this tick's arrival count and append
    /// it to the producer's backlog, tagged with the generation tick.
    ///
    /// Returns the generated count. Must be called exactly once per tick per
    /// active producer.
    ///
    /// # Panics
    /// Panics if the vertex is not a producer.
    pub fn generate(&mut self, id: &VertexId, tick: u64) -> u64 {
        let entry = self.entry_mut(id);
        let generator = entry
            .generator
            .as_mut()
            .expect("generate() called on non-producer vertex");
        let count = generator.events_for_tick(tick);
        if count > 0 {
            entry.pending.push_back(EventSet {
                origin_tick: tick,
                count,
            });
            entry.pending_total += count;
        }
        count
    }

    /// Dequeue up to `max_events` events, oldest origination first.
    ///
    /// Partial consumption is allowed: if fewer events are queued, everything
    /// pending is returned. Batches are split when the limit lands inside one.
    pub fn consume(&mut self, id: &VertexId, max_events: u64) -> Vec<EventSet> {
        let entry = self.entry_mut(id);
        let mut remaining = max_events;
        let mut consumed = Vec::new();

        while remaining > 0 {
            let Some(front) = entry.pending.front_mut() else {
                break;
            };
            if front.count <= remaining {
                remaining -= front.count;
                entry.pending_total -= front.count;
                consumed.push(entry.pending.pop_front().expect("front checked"));
            } else {
                front.count -= remaining;
                entry.pending_total -= remaining;
                consumed.push(EventSet {
                    origin_tick: front.origin_tick,
                    count: remaining,
                });
                remaining = 0;
            }
        }
        consumed
    }

    /// Forward a set of just-processed events along every output edge of
    /// `source`, independently weighted by each edge's selectivity.
    ///
    /// Emission per edge is `floor(selectivity * count + carry)` with the
    /// fractional carry persisted on the edge across ticks. Forwarded events
    /// keep their origination ticks, oldest first. Destination queues clamp
    /// at capacity; the overflow is reported as dropped.
    pub fn forward(&mut self, source: &VertexId, completed: &[EventSet]) -> Vec<ForwardOutcome> {
        let total: u64 = completed.iter().map(|set| set.count).sum();

        // Phase 1: fix per-edge emission counts, updating carries.
        let entry = self.entry_mut(source);
        let mut emissions: Vec<(VertexId, u64)> = Vec::with_capacity(entry.outputs.len());
        for channel in &mut entry.outputs {
            let exact = channel.selectivity * total as f64 + channel.carry;
            let emitted = exact.floor() as u64;
            channel.carry = exact - emitted as f64;
            emissions.push((channel.destination.clone(), emitted));
        }

        // Phase 2: enqueue at each destination, clamping at capacity.
        let mut outcomes = Vec::with_capacity(emissions.len());
        for (destination, emitted) in emissions {
            let destination_entry = self.entry_mut(&destination);
            let space = match destination_entry.queue_capacity {
                Some(capacity) => capacity.saturating_sub(destination_entry.pending_total),
                None => u64::MAX,
            };
            let accepted = emitted.min(space);
            let dropped = emitted - accepted;

            let mut to_place = accepted;
            for set in completed {
                if to_place == 0 {
                    break;
                }
                let count = set.count.min(to_place);
                destination_entry.pending.push_back(EventSet {
                    origin_tick: set.origin_tick,
                    count,
                });
                to_place -= count;
            }
            destination_entry.pending_total += accepted;

            outcomes.push(ForwardOutcome {
                destination,
                enqueued: accepted,
                dropped,
            });
        }
        outcomes
    }

    /// Identifiers of all producer vertices, in identifier order.
    pub fn producer_ids(&self) -> Vec<VertexId> {
        self.vertices
            .iter()
            .filter(|(_, entry)| entry.kind == VertexKind::Producer)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

// Manual Debug implementation (generator instances are not Debug)
impl fmt::Debug for RuntimeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pending: BTreeMap<&VertexId, u64> = self
            .vertices
            .iter()
            .map(|(id, entry)| (id, entry.pending_total))
            .collect();
        f.debug_struct("RuntimeState")
            .field("num_vertices", &self.vertices.len())
            .field("pending", &pending)
            .finish()
    }
}
