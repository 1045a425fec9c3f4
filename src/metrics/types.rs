//! Core metric types for the aggregation shards

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of aggregated metric. Each kind lives in its own collection of a
/// [`MetricMap`](super::MetricMap).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    /// Summed per flush interval
    Counter,
    /// Raw timing samples
    Timer,
    /// Last value wins
    Gauge,
    /// Unique members
    Set,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Counter,
        MetricKind::Timer,
        MetricKind::Gauge,
        MetricKind::Set,
    ];

    /// Plural name, as used by console commands ("counters", "delcounters")
    pub fn plural(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counters",
            MetricKind::Timer => "timers",
            MetricKind::Gauge => "gauges",
            MetricKind::Set => "sets",
        }
    }

    /// Parse a plural name back to a kind
    pub fn from_plural(name: &str) -> Option<MetricKind> {
        MetricKind::ALL.into_iter().find(|kind| kind.plural() == name)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.plural())
    }
}

/// A set of tags (key-value pairs) associated with a metric.
/// Tags are kept sorted so the same set always renders to the same key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagSet {
    tags: BTreeMap<String, String>,
}

impl TagSet {
    pub fn new(tags: BTreeMap<String, String>) -> Self {
        TagSet { tags }
    }

    pub fn empty() -> Self {
        TagSet::default()
    }

    /// Create TagSet from slice of (key, value) tuples
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let tags = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self::new(tags)
    }

    /// Parse tags from "key:value,key2:value2" format.
    /// Pairs with an empty key or value are skipped.
    pub fn parse(s: &str) -> Self {
        let tags = s
            .split(',')
            .filter_map(|pair| {
                let (key, value) = pair.split_once(':')?;
                let (key, value) = (key.trim(), value.trim());
                if key.is_empty() || value.is_empty() {
                    None
                } else {
                    Some((key.to_string(), value.to_string()))
                }
            })
            .collect();
        Self::new(tags)
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.tags.get(key)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Renders as "key:value,key2:value2"; this string is the tag-set key
/// inside a metric collection.
impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.tags.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}:{}", k, v)?;
        }
        Ok(())
    }
}

/// Value carried by a single received metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetricValue {
    Counter(i64),
    Timer(f64),
    Gauge(f64),
    Set(String),
}

impl MetricValue {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricValue::Counter(_) => MetricKind::Counter,
            MetricValue::Timer(_) => MetricKind::Timer,
            MetricValue::Gauge(_) => MetricKind::Gauge,
            MetricValue::Set(_) => MetricKind::Set,
        }
    }
}

/// A single metric as handed over by the receiving front end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Metric name (e.g., "http.requests", "system.cpu.load")
    pub name: String,

    /// Tags associated with this metric
    pub tags: TagSet,

    /// The value being submitted
    pub value: MetricValue,
}

impl Metric {
    pub fn counter(name: impl Into<String>, tags: TagSet, value: i64) -> Self {
        Metric {
            name: name.into(),
            tags,
            value: MetricValue::Counter(value),
        }
    }

    pub fn timer(name: impl Into<String>, tags: TagSet, value: f64) -> Self {
        Metric {
            name: name.into(),
            tags,
            value: MetricValue::Timer(value),
        }
    }

    pub fn gauge(name: impl Into<String>, tags: TagSet, value: f64) -> Self {
        Metric {
            name: name.into(),
            tags,
            value: MetricValue::Gauge(value),
        }
    }

    pub fn set(name: impl Into<String>, tags: TagSet, member: impl Into<String>) -> Self {
        Metric {
            name: name.into(),
            tags,
            value: MetricValue::Set(member.into()),
        }
    }

    pub fn kind(&self) -> MetricKind {
        self.value.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_set_creation() {
        let tags = TagSet::from_pairs(&[("host", "web01"), ("env", "prod")]);
        assert_eq!(tags.get("host"), Some(&"web01".to_string()));
        assert_eq!(tags.get("env"), Some(&"prod".to_string()));
        assert_eq!(tags.get("missing"), None);
    }

    #[test]
    fn test_tag_set_parsing() {
        let tags = TagSet::parse("host:web01,env:prod,service:api");
        assert_eq!(tags.len(), 3);
        assert_eq!(tags.get("service"), Some(&"api".to_string()));

        let partial = TagSet::parse("host:,:x,region:eu");
        assert_eq!(partial.len(), 1);
        assert!(TagSet::parse("").is_empty());
    }

    #[test]
    fn test_tag_set_display_sorted() {
        let tags1 = TagSet::from_pairs(&[("b", "2"), ("a", "1")]);
        assert_eq!(tags1.to_string(), "a:1,b:2");
        assert_eq!(TagSet::empty().to_string(), "");
    }

    #[test]
    fn test_metric_kind_names() {
        for kind in MetricKind::ALL {
            assert_eq!(MetricKind::from_plural(kind.plural()), Some(kind));
        }
        assert_eq!(MetricKind::from_plural("counter"), None);
    }

    #[test]
    fn test_metric_kind_from_value() {
        let tags = TagSet::from_pairs(&[("host", "web01")]);
        assert_eq!(Metric::counter("a", tags.clone(), 1).kind(), MetricKind::Counter);
        assert_eq!(Metric::timer("a", tags.clone(), 1.5).kind(), MetricKind::Timer);
        assert_eq!(Metric::gauge("a", tags.clone(), 2.0).kind(), MetricKind::Gauge);
        assert_eq!(Metric::set("a", tags, "u1").kind(), MetricKind::Set);
    }
}
