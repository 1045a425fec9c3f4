use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt::Display;

/// Snapshot of the flush-to-backend pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlusherStats {
    pub last_flush: Option<DateTime<Utc>>,
    pub last_flush_error: Option<String>,
}

pub trait Flusher: Send + Sync {
    fn stats(&self) -> FlusherStats;
}

/// Flush outcome tracker. Time and error are updated together so a snapshot
/// never pairs a flush time with another flush's error.
#[derive(Debug, Default)]
pub struct FlushStatsTracker {
    inner: Mutex<FlusherStats>,
}

impl FlushStatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_flush<E: Display>(&self, result: Result<(), E>) {
        let mut stats = self.inner.lock();
        stats.last_flush = Some(Utc::now());
        stats.last_flush_error = result.err().map(|e| e.to_string());
    }
}

impl Flusher for FlushStatsTracker {
    fn stats(&self) -> FlusherStats {
        self.inner.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_cleared_by_successful_flush() {
        let tracker = FlushStatsTracker::new();
        assert_eq!(tracker.stats(), FlusherStats::default());

        tracker.record_flush(Err("backend timeout"));
        let failed = tracker.stats();
        assert!(failed.last_flush.is_some());
        assert_eq!(failed.last_flush_error.as_deref(), Some("backend timeout"));

        tracker.record_flush::<String>(Ok(()));
        assert_eq!(tracker.stats().last_flush_error, None);
    }
}
