//! Metric state held by the aggregation shards
//!
//! - [`Metric`] is what the receiving front end hands to a shard
//! - [`MetricMap`] is the per-shard state, one collection per [`MetricKind`]

mod metric_map;
mod types;

pub use metric_map::{AggregatedMetrics, MetricCollection, MetricMap, Set, Timer};
pub use types::{Metric, MetricKind, MetricValue, TagSet};
