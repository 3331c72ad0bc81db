//! Metric aggregation into per-vertex minute buckets
//!
//! The aggregator observes every consume, produce, and drop effect during
//! propagation and accumulates them into fixed-size time buckets: one bucket
//! per (vertex, minute index), created lazily on first observation and never
//! removed during a run.
//!
//! # Reporting policy
//!
//! The query accessors return sequences in increasing minute order with one
//! entry per minute that had at least one relevant observation. Silent
//! minutes are **not** zero-filled — this is a deliberate policy choice, not
//! an accident of the representation.
//!
//! Latency is measured in ticks: the age of an event from its origination
//! tick at the producer to its consumption tick at the observed vertex.

use crate::core::time::minute_of;
use crate::query::VertexId;
use crate::state::EventSet;
use serde::Serialize;
use std::collections::BTreeMap;

/// Cumulative counters for one (vertex, minute) pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsBucket {
    /// Events consumed (dequeued and processed) this minute
    pub consumed: u64,
    /// Events that finished processing and were offered downstream
    pub produced: u64,
    /// Events lost to queue overflow at this vertex this minute
    pub dropped: u64,
    /// Sum of per-event latencies (in ticks) over the consumed events
    pub latency_sum: u64,
}

impl MetricsBucket {
    /// Mean per-event latency in ticks; 0.0 when nothing was consumed.
    pub fn mean_latency(&self) -> f64 {
        if self.consumed == 0 {
            0.0
        } else {
            self.latency_sum as f64 / self.consumed as f64
        }
    }
}

/// Accumulates per-vertex, per-minute statistics for a run.
///
/// # Example
/// ```
/// use cep_simulator_core_rs::metrics::MetricsAggregator;
/// use cep_simulator_core_rs::query::VertexId;
/// use cep_simulator_core_rs::state::EventSet;
///
/// let mut metrics = MetricsAggregator::new(1.0); // 60 ticks per minute
/// let sink = VertexId::new("sink");
///
/// metrics.record_consumed(&sink, 10, &[EventSet { origin_tick: 8, count: 5 }]);
/// assert_eq!(metrics.throughput_by_minute(&sink), vec![(0, 5)]);
/// assert_eq!(metrics.latency_by_minute(&sink), vec![(0, 2.0)]);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct MetricsAggregator {
    tick_interval_secs: f64,
    buckets: BTreeMap<VertexId, BTreeMap<u64, MetricsBucket>>,
}

impl MetricsAggregator {
    /// # Panics
    /// Panics if `tick_interval_secs` is not positive.
    pub fn new(tick_interval_secs: f64) -> Self {
        assert!(
            tick_interval_secs > 0.0,
            "tick_interval_secs must be positive"
        );
        Self {
            tick_interval_secs,
            buckets: BTreeMap::new(),
        }
    }

    fn bucket_mut(&mut self, vertex: &VertexId, tick: u64) -> &mut MetricsBucket {
        let minute = minute_of(tick, self.tick_interval_secs);
        self.buckets
            .entry(vertex.clone())
            .or_default()
            .entry(minute)
            .or_default()
    }

    /// Observe a consume effect: `sets` are the event batches dequeued at
    /// `tick`; each contributes its count and its age to the bucket.
    pub fn record_consumed(&mut self, vertex: &VertexId, tick: u64, sets: &[EventSet]) {
        if sets.is_empty() {
            return;
        }
        let bucket = self.bucket_mut(vertex, tick);
        for set in sets {
            bucket.consumed += set.count;
            bucket.latency_sum += (tick - set.origin_tick) * set.count;
        }
    }

    /// Observe a produce effect: `count` events finished processing at `tick`.
    pub fn record_produced(&mut self, vertex: &VertexId, tick: u64, count: u64) {
        if count == 0 {
            return;
        }
        self.bucket_mut(vertex, tick).produced += count;
    }

    /// Observe queue-overflow loss at the destination vertex.
    pub fn record_dropped(&mut self, vertex: &VertexId, tick: u64, count: u64) {
        if count == 0 {
            return;
        }
        self.bucket_mut(vertex, tick).dropped += count;
    }

    /// Mean consumption latency (ticks) per minute, in increasing minute
    /// order; one entry per minute with at least one consumed event.
    pub fn latency_by_minute(&self, vertex: &VertexId) -> Vec<(u64, f64)> {
        self.minutes(vertex)
            .filter(|(_, b)| b.consumed > 0)
            .map(|(minute, b)| (minute, b.mean_latency()))
            .collect()
    }

    /// Events consumed per minute, in increasing minute order; one entry per
    /// minute with at least one consumed event.
    pub fn throughput_by_minute(&self, vertex: &VertexId) -> Vec<(u64, u64)> {
        self.minutes(vertex)
            .filter(|(_, b)| b.consumed > 0)
            .map(|(minute, b)| (minute, b.consumed))
            .collect()
    }

    /// Events that finished processing per minute.
    pub fn produced_by_minute(&self, vertex: &VertexId) -> Vec<(u64, u64)> {
        self.minutes(vertex)
            .filter(|(_, b)| b.produced > 0)
            .map(|(minute, b)| (minute, b.produced))
            .collect()
    }

    /// Events lost to queue overflow per minute.
    pub fn dropped_by_minute(&self, vertex: &VertexId) -> Vec<(u64, u64)> {
        self.minutes(vertex)
            .filter(|(_, b)| b.dropped > 0)
            .map(|(minute, b)| (minute, b.dropped))
            .collect()
    }

    /// Raw bucket access, mainly for tests and export layers.
    pub fn bucket(&self, vertex: &VertexId, minute: u64) -> Option<&MetricsBucket> {
        self.buckets.get(vertex).and_then(|m| m.get(&minute))
    }

    /// Vertices that have at least one bucket, in identifier order.
    pub fn observed_vertices(&self) -> impl Iterator<Item = &VertexId> {
        self.buckets.keys()
    }

    fn minutes<'a>(
        &'a self,
        vertex: &VertexId,
    ) -> Box<dyn Iterator<Item = (u64, &'a MetricsBucket)> + 'a> {
        match self.buckets.get(vertex) {
            Some(map) => Box::new(map.iter().map(|(minute, bucket)| (*minute, bucket))),
            None => Box::new(std::iter::empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(origin_tick: u64, count: u64) -> EventSet {
        EventSet { origin_tick, count }
    }

    #[test]
    fn test_buckets_created_lazily() {
        let metrics = MetricsAggregator::new(0.1);
        let v = VertexId::new("v");
        assert!(metrics.bucket(&v, 0).is_none());
        assert!(metrics.throughput_by_minute(&v).is_empty());
    }

    #[test]
    fn test_minute_bucketing() {
        let mut metrics = MetricsAggregator::new(0.1); // 600 ticks per minute
        let v = VertexId::new("v");

        metrics.record_consumed(&v, 599, &[set(599, 2)]);
        metrics.record_consumed(&v, 600, &[set(600, 3)]);

        assert_eq!(metrics.throughput_by_minute(&v), vec![(0, 2), (1, 3)]);
    }

    #[test]
    fn test_mean_latency() {
        let mut metrics = MetricsAggregator::new(1.0);
        let v = VertexId::new("v");

        // ages 4 and 2, weighted 1 and 3 -> mean (4 + 6) / 4 = 2.5
        metrics.record_consumed(&v, 10, &[set(6, 1), set(8, 3)]);
        assert_eq!(metrics.latency_by_minute(&v), vec![(0, 2.5)]);
    }

    #[test]
    fn test_silent_minutes_not_zero_filled() {
        let mut metrics = MetricsAggregator::new(1.0);
        let v = VertexId::new("v");

        metrics.record_consumed(&v, 0, &[set(0, 1)]);
        metrics.record_consumed(&v, 180, &[set(180, 1)]); // minute 3

        let minutes: Vec<u64> = metrics
            .throughput_by_minute(&v)
            .into_iter()
            .map(|(m, _)| m)
            .collect();
        assert_eq!(minutes, vec![0, 3]);
    }

    #[test]
    fn test_drops_tracked_separately() {
        let mut metrics = MetricsAggregator::new(1.0);
        let v = VertexId::new("v");

        metrics.record_dropped(&v, 30, 7);
        assert_eq!(metrics.dropped_by_minute(&v), vec![(0, 7)]);
        // a dropped-only minute does not appear in latency/throughput
        assert!(metrics.latency_by_minute(&v).is_empty());
        assert!(metrics.throughput_by_minute(&v).is_empty());
    }
}
