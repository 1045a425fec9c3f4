use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Snapshot of the receiving front end
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReceiverStats {
    pub bad_lines: u64,
    pub metrics_received: u64,
    pub packets_received: u64,
    /// `None` until the first packet arrives
    pub last_packet: Option<DateTime<Utc>>,
}

pub trait Receiver: Send + Sync {
    fn stats(&self) -> ReceiverStats;
}

/// Lock-free counters updated by the receiving path
#[derive(Debug, Default)]
pub struct ReceiverStatsTracker {
    bad_lines: AtomicU64,
    metrics_received: AtomicU64,
    packets_received: AtomicU64,
    /// Milliseconds since the epoch, 0 = never
    last_packet_ms: AtomicI64,
}

impl ReceiverStatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one packet carrying `metrics` parsed metrics
    pub fn record_packet(&self, metrics: u64) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
        self.metrics_received.fetch_add(metrics, Ordering::Relaxed);
        self.last_packet_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    pub fn record_bad_line(&self) {
        self.bad_lines.fetch_add(1, Ordering::Relaxed);
    }
}

impl Receiver for ReceiverStatsTracker {
    fn stats(&self) -> ReceiverStats {
        let last_packet_ms = self.last_packet_ms.load(Ordering::Relaxed);
        let last_packet = if last_packet_ms == 0 {
            None
        } else {
            Utc.timestamp_millis_opt(last_packet_ms).single()
        };

        ReceiverStats {
            bad_lines: self.bad_lines.load(Ordering::Relaxed),
            metrics_received: self.metrics_received.load(Ordering::Relaxed),
            packets_received: self.packets_received.load(Ordering::Relaxed),
            last_packet,
        }
    }
}
