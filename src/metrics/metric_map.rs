//! Per-shard metric state
//!
//! A [`MetricMap`] is owned by exactly one aggregator and is only ever touched
//! from that aggregator's task, so nothing in here is synchronized.

use super::types::{Metric, MetricKind, MetricValue, TagSet};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Write};

/// Timing samples collected for one name/tag set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timer {
    pub values: Vec<f64>,
}

impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", v)?;
        }
        f.write_str("]")
    }
}

/// Unique members seen for one name/tag set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Set {
    pub members: BTreeSet<String>,
}

impl fmt::Display for Set {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, m) in self.members.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(m)?;
        }
        f.write_str("}")
    }
}

/// Metrics of one kind: name -> tag-set key -> aggregated value
#[derive(Debug, Clone, PartialEq)]
pub struct MetricCollection<V> {
    metrics: BTreeMap<String, BTreeMap<String, V>>,
}

impl<V> Default for MetricCollection<V> {
    fn default() -> Self {
        MetricCollection {
            metrics: BTreeMap::new(),
        }
    }
}

impl<V: Default> MetricCollection<V> {
    /// Value for `name`/`tags`, inserted as `V::default()` if missing
    pub fn entry(&mut self, name: &str, tags: &TagSet) -> &mut V {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .entry(tags.to_string())
            .or_default()
    }
}

impl<V> MetricCollection<V> {
    pub fn get(&self, name: &str, tags: &TagSet) -> Option<&V> {
        self.metrics.get(name)?.get(&tags.to_string())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.metrics.contains_key(name)
    }

    /// Iterate `(name, tag-set key, value)` in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &V)> {
        self.metrics.iter().flat_map(|(name, by_tags)| {
            by_tags
                .iter()
                .map(move |(tags, value)| (name.as_str(), tags.as_str(), value))
        })
    }
}

/// Kind-agnostic view of a collection, used by operations that select a
/// collection at runtime.
pub trait AggregatedMetrics {
    /// Append one `name=value` / `name{tags}=value` line per entry
    fn render(&self, out: &mut String);

    /// Remove every tag set of `name`. Returns whether anything was removed.
    fn delete(&mut self, name: &str) -> bool;

    /// Number of distinct metric names
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: fmt::Display> AggregatedMetrics for MetricCollection<V> {
    fn render(&self, out: &mut String) {
        for (name, tags, value) in self.iter() {
            // Writing into a String cannot fail
            let _ = if tags.is_empty() {
                writeln!(out, "{}={}", name, value)
            } else {
                writeln!(out, "{}{{{}}}={}", name, tags, value)
            };
        }
    }

    fn delete(&mut self, name: &str) -> bool {
        let removed = self.metrics.remove(name).is_some();
        debug_assert!(
            !self.metrics.contains_key(name),
            "Postcondition violated: name must not exist after delete"
        );
        removed
    }

    fn len(&self) -> usize {
        self.metrics.len()
    }
}

/// All metric state of one shard
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricMap {
    pub counters: MetricCollection<i64>,
    pub timers: MetricCollection<Timer>,
    pub gauges: MetricCollection<f64>,
    pub sets: MetricCollection<Set>,
}

impl MetricMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a received metric into the shard: counters add, timers append,
    /// gauges replace, sets insert.
    pub fn receive(&mut self, metric: Metric) {
        let Metric { name, tags, value } = metric;
        match value {
            MetricValue::Counter(v) => {
                let counter = self.counters.entry(&name, &tags);
                *counter = counter.saturating_add(v);
            }
            MetricValue::Timer(v) => self.timers.entry(&name, &tags).values.push(v),
            MetricValue::Gauge(v) => *self.gauges.entry(&name, &tags) = v,
            MetricValue::Set(member) => {
                self.sets.entry(&name, &tags).members.insert(member);
            }
        }
    }

    pub fn collection(&self, kind: MetricKind) -> &dyn AggregatedMetrics {
        match kind {
            MetricKind::Counter => &self.counters,
            MetricKind::Timer => &self.timers,
            MetricKind::Gauge => &self.gauges,
            MetricKind::Set => &self.sets,
        }
    }

    pub fn collection_mut(&mut self, kind: MetricKind) -> &mut dyn AggregatedMetrics {
        match kind {
            MetricKind::Counter => &mut self.counters,
            MetricKind::Timer => &mut self.timers,
            MetricKind::Gauge => &mut self.gauges,
            MetricKind::Set => &mut self.sets,
        }
    }

    pub fn is_empty(&self) -> bool {
        MetricKind::ALL
            .iter()
            .all(|kind| self.collection(*kind).is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(map: &MetricMap, kind: MetricKind) -> String {
        let mut out = String::new();
        map.collection(kind).render(&mut out);
        out
    }

    #[test]
    fn test_counters_accumulate() {
        let mut map = MetricMap::new();
        let tags = TagSet::from_pairs(&[("host", "web01")]);
        map.receive(Metric::counter("requests", tags.clone(), 2));
        map.receive(Metric::counter("requests", tags.clone(), 3));
        map.receive(Metric::counter("requests", TagSet::empty(), 7));

        assert_eq!(map.counters.get("requests", &tags), Some(&5));
        assert_eq!(map.counters.get("requests", &TagSet::empty()), Some(&7));
        assert_eq!(map.counters.len(), 1);
    }

    #[test]
    fn test_gauge_timer_set_semantics() {
        let mut map = MetricMap::new();
        let tags = TagSet::empty();
        map.receive(Metric::gauge("load", tags.clone(), 1.5));
        map.receive(Metric::gauge("load", tags.clone(), 0.5));
        map.receive(Metric::timer("latency", tags.clone(), 10.0));
        map.receive(Metric::timer("latency", tags.clone(), 12.5));
        map.receive(Metric::set("users", tags.clone(), "alice"));
        map.receive(Metric::set("users", tags.clone(), "alice"));
        map.receive(Metric::set("users", tags.clone(), "bob"));

        assert_eq!(map.gauges.get("load", &tags), Some(&0.5));
        assert_eq!(map.timers.get("latency", &tags).map(|t| t.values.len()), Some(2));
        assert_eq!(map.sets.get("users", &tags).map(|s| s.members.len()), Some(2));
    }

    #[test]
    fn test_render_lines() {
        let mut map = MetricMap::new();
        map.receive(Metric::counter("a", TagSet::empty(), 5));
        map.receive(Metric::counter("b", TagSet::from_pairs(&[("env", "prod"), ("az", "1")]), 3));
        map.receive(Metric::timer("t", TagSet::empty(), 1.0));
        map.receive(Metric::timer("t", TagSet::empty(), 2.5));
        map.receive(Metric::set("s", TagSet::empty(), "y"));
        map.receive(Metric::set("s", TagSet::empty(), "x"));

        assert_eq!(rendered(&map, MetricKind::Counter), "a=5\nb{az:1,env:prod}=3\n");
        assert_eq!(rendered(&map, MetricKind::Timer), "t=[1 2.5]\n");
        assert_eq!(rendered(&map, MetricKind::Set), "s={x y}\n");
        assert_eq!(rendered(&map, MetricKind::Gauge), "");
    }

    #[test]
    fn test_delete_removes_all_tag_sets() {
        let mut map = MetricMap::new();
        map.receive(Metric::gauge("g", TagSet::from_pairs(&[("host", "a")]), 1.0));
        map.receive(Metric::gauge("g", TagSet::from_pairs(&[("host", "b")]), 2.0));

        let gauges = map.collection_mut(MetricKind::Gauge);
        assert!(gauges.delete("g"));
        assert!(!gauges.delete("g"));
        assert!(!gauges.delete("never-seen"));
        assert!(map.is_empty());
    }

    #[test]
    fn test_collections_are_independent() {
        let mut map = MetricMap::new();
        map.receive(Metric::counter("x", TagSet::empty(), 1));
        map.receive(Metric::gauge("x", TagSet::empty(), 1.0));

        assert!(map.collection_mut(MetricKind::Counter).delete("x"));
        assert!(map.gauges.contains("x"));
        assert!(map.counters.is_empty());
    }
}
