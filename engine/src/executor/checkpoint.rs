//! Reproducibility digests
//!
//! Canonical SHA-256 digests of configurations and metric reports. Two runs
//! of the same configuration must be byte-identical; comparing digests is
//! how that invariant is checked without shipping full reports around.
//!
//! Canonicalization recursively sorts all JSON object keys, so hashing is
//! independent of any map iteration order.

use crate::executor::SimulationError;
use crate::metrics::MetricsAggregator;
use crate::query::VertexId;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Compute a deterministic SHA-256 digest of any serializable config.
pub fn config_digest<T: Serialize>(config: &T) -> Result<String, SimulationError> {
    let value = serde_json::to_value(config).map_err(|e| {
        SimulationError::InvalidConfig(format!("config serialization failed: {}", e))
    })?;
    Ok(hash_value(value))
}

/// Compute a deterministic SHA-256 digest of a run's metric report.
///
/// The report covers, per observed vertex: latency-by-minute,
/// throughput-by-minute, and dropped-by-minute sequences. Two runs of the
/// same configuration produce the same digest.
pub fn metrics_digest(metrics: &MetricsAggregator) -> String {
    #[derive(Serialize)]
    struct VertexReport {
        latency: Vec<(u64, f64)>,
        throughput: Vec<(u64, u64)>,
        dropped: Vec<(u64, u64)>,
    }

    let report: BTreeMap<&VertexId, VertexReport> = metrics
        .observed_vertices()
        .map(|vertex| {
            (
                vertex,
                VertexReport {
                    latency: metrics.latency_by_minute(vertex),
                    throughput: metrics.throughput_by_minute(vertex),
                    dropped: metrics.dropped_by_minute(vertex),
                },
            )
        })
        .collect();

    let value = serde_json::to_value(&report).expect("metric report serializes");
    hash_value(value)
}

/// Recursively sort object keys, serialize, and hash.
fn hash_value(value: serde_json::Value) -> String {
    fn canonicalize(value: serde_json::Value) -> serde_json::Value {
        match value {
            serde_json::Value::Object(map) => {
                let sorted: BTreeMap<String, serde_json::Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                serde_json::Value::Object(sorted.into_iter().collect())
            }
            serde_json::Value::Array(arr) => {
                serde_json::Value::Array(arr.into_iter().map(canonicalize).collect())
            }
            other => other,
        }
    }

    let json = serde_json::to_string(&canonicalize(value)).expect("canonical value serializes");
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    format!("{:x}", hasher.finalize())
}
